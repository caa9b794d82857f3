fn main() -> anyhow::Result<()> {
    task_cells::cli::run()
}
