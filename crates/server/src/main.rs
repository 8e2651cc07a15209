#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nextalk_server::run().await
}
