#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fallacy_guard_lib::run().await
}
