pub mod color;
pub mod logging;
pub mod scroll;
#[cfg(test)]
pub mod test_utils;
