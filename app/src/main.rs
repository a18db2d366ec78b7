fn main() -> anyhow::Result<()> {
    loopwise_lib::run()
}
