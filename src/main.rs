//! MyNet command line entry point

use mynet::app::AppContext;
use mynet::cli_adapter::run_with_ctrl_c;

#[tokio::main]
async fn main() {
    if let Err(e) = mynet::logging::init_logging() {
        eprintln!("[WARN] Failed to initialize structured logging: {}", e);
    }

    let context = AppContext::from_env();
    if let Err(e) = run_with_ctrl_c(std::env::args(), &context).await {
        mynet::log_error!("{:#}", e);
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
