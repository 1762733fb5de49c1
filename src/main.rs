//! xs - local multi-model assistant.
//!
//! Each request is classified into a scenario (text, tool, vision, ocr),
//! served by that scenario's pipeline on a local Ollama backend, and the
//! displayable part of the answer is printed.

mod app;
mod cli;
mod clipboard;

use clap::Parser;
use std::io::{self, Write};
use std::sync::Arc;

use xs_controller::build_registry;
use xs_core::config::AppConfig;
use xs_gateway::{Dispatcher, Renderer, RequestHandler, RetryPolicy, StdoutReporter};
use xs_model_gateway::{create_client, BackendProbe};

use crate::app::{print_lines, user_message, App};
use crate::cli::{Cli, Command};
use crate::clipboard::SystemClipboard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Err(e) = xs_governance::configure_tracing(cli.verbose) {
        eprintln!("{}", e);
    }

    serve(cli, &mut Renderer::stdout()).await?;
    Ok(())
}

/// Serve one invocation. Every problem is written to `out`; only a
/// failing writer is an error.
async fn serve<W: Write>(cli: Cli, out: &mut Renderer<W>) -> io::Result<()> {
    let command = cli.command();

    // Usage needs neither configuration nor backend.
    if command == Command::Usage {
        return print_lines(out, cli::USAGE);
    }

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return out.line(&format!("配置加载失败: {}", user_message(&e))).map(drop),
    };
    tracing::info!(version = env!("CARGO_PKG_VERSION"), base_url = %config.system.base_url(), "Starting xs");

    let probe = match BackendProbe::new(&config.system) {
        Ok(probe) => probe,
        Err(e) => return out.line(&format!("错误: {}", user_message(&e))).map(drop),
    };
    let ready = probe.ensure_available(|line| println!("{}", line)).await;
    if let Err(e) = ready {
        tracing::warn!(error = %e, "Backend unavailable");
        out.line(&format!("错误: {}", user_message(&e)))?;
        out.line("提示：请确认已安装Ollama，手动运行 'ollama serve' 后重试。")?;
        out.line("无法启动Ollama服务，程序退出。")?;
        return Ok(());
    }

    let working_dir = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => return out.line(&format!("错误: 无法获取当前目录: {}", e)).map(drop),
    };
    let registry = match build_registry(&config, &working_dir, |scenario| create_client(&config, scenario)) {
        Ok(registry) => registry,
        Err(e) => {
            tracing::error!(error = %e, "Pipeline setup failed");
            return out.line(&format!("初始化失败: {}", user_message(&e))).map(drop);
        }
    };

    let dispatcher = Dispatcher::new(&registry, Arc::new(StdoutReporter))
        .with_policy(RetryPolicy::from_config(&config.system));
    let handler = RequestHandler::new(dispatcher)
        .with_streaming(config.models.streaming && !cli.no_stream);
    let app = App::new(&config, handler, SystemClipboard, working_dir);

    if let Err(e) = app.run(command, out).await {
        tracing::error!(error = %e, "Request failed");
        out.line(&format!("错误: {}", user_message(&e)))?;
    }
    Ok(())
}
