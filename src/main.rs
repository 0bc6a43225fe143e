fn main() -> anyhow::Result<()> {
    readpace_lib::run()
}
