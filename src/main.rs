fn main() -> anyhow::Result<()> {
    palmtrack::logging::init();
    palmtrack::cli::run()
}
