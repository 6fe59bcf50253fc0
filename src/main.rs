use log::{error, info};
use proxyproto_listener::{Conf, Server};
use std::{
    process::ExitCode,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

const POLL_TIMEOUT: Duration = Duration::from_millis(1000);

fn main() -> ExitCode {
    let conf = Conf::load();

    env_logger::Builder::new()
        .filter_level(conf.log_level.level_filter())
        .init();

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst)) {
        error!("Failed to install signal handler: {}", e);
        return ExitCode::FAILURE;
    }

    let mut server = Server::new(conf.listen_port);
    if let Err(e) = server.start() {
        error!("server start failed ({}): {}", e.code(), e);
        return ExitCode::FAILURE;
    }

    info!("server start at port {}", conf.listen_port);
    while running.load(Ordering::SeqCst) {
        server.poll(Some(POLL_TIMEOUT));
    }
    server.stop();
    info!("server stop");

    ExitCode::SUCCESS
}
