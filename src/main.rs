use anyhow::Result;
use prompt_batch::{logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logger::init();

    // 加载配置（缺少必填项直接退出）
    let config = Config::from_env()?;

    // 初始化并运行应用
    App::initialize(config).run().await?;

    Ok(())
}
