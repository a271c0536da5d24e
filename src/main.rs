fn main() -> anyhow::Result<()> {
    pnl_journal_lib::run()
}
