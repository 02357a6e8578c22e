#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ticketvault::server::run().await
}
