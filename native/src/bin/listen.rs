// Diagnostic listener: prints every announcement the shim sends.

extern crate saapi;
use log::{error, info};
use std::io::Write;

fn main() {
    saapi::logging::init_once();

    let config = saapi::config::ListenerConfig::from_env();
    info!(
        "[LISTENER] saapi-listen {} on {}",
        saapi::get_version(),
        config.pipe_name
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("[LISTENER] Failed to create Tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(saapi::ipc::serve(&config.pipe_name, |text| {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", text);
        let _ = stdout.flush();
    }));

    if let Err(e) = result {
        saapi::logging::log_critical_error("Listener", &e.to_string());
        std::process::exit(1);
    }
}
