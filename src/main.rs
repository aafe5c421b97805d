fn main() -> Result<(), Box<dyn std::error::Error>> {
    io_tui::cli::main()
}
