//! Selection overlay state for personas, providers, models, and conversations.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerKind {
    Persona,
    Provider,
    Model,
    Conversation,
}

impl PickerKind {
    pub fn title(self) -> &'static str {
        match self {
            PickerKind::Persona => "Select Persona",
            PickerKind::Provider => "Select Provider",
            PickerKind::Model => "Select Model",
            PickerKind::Conversation => "Resume Conversation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerItem {
    /// Argument handed to the matching command when applied.
    pub value: String,
    pub label: String,
    pub detail: Option<String>,
    pub current: bool,
}

#[derive(Debug, Clone)]
pub struct PickerState {
    pub kind: PickerKind,
    pub items: Vec<PickerItem>,
    pub selected: usize,
}

impl PickerState {
    /// Starts on the current entry when there is one.
    pub fn new(kind: PickerKind, items: Vec<PickerItem>) -> Self {
        let selected = items.iter().position(|item| item.current).unwrap_or(0);
        Self {
            kind,
            items,
            selected,
        }
    }

    pub fn move_up(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.selected = if self.selected == 0 {
            self.items.len() - 1
        } else {
            self.selected - 1
        };
    }

    pub fn move_down(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.selected = (self.selected + 1) % self.items.len();
    }

    pub fn selected_item(&self) -> Option<&PickerItem> {
        self.items.get(self.selected)
    }
}
