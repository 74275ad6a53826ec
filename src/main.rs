use std::process;
use std::sync::Arc;

use clap::Parser;
use log::info;

use eureka_proxy::config::{self, TargetArg};
use eureka_proxy::fake::{self, FakeApp, FakeRegistry};
use eureka_proxy::logging::{self, AccessLog};
use eureka_proxy::proxy::{self, ProxyConfig, ReverseProxy, RouteConfig};
use eureka_proxy::ProxyError;

const DEFAULT_PORT: u16 = 8761;

/// Transparent Eureka proxy that injects fake application instances into the
/// registry view observed by discovery clients.
#[derive(Debug, Parser)]
#[command(
    name = "eureka-proxy",
    disable_version_flag = true,
    after_help = "example:\n        eureka-proxy http://my-dev-environment.net:8761"
)]
struct Args {
    /// Upstream eureka URL or path to a YAML configuration file
    target: Option<String>,

    /// Print version and exit
    #[arg(short = 'v', long = "version")]
    version: bool,

    /// Port on which to start the proxy
    #[arg(long)]
    port: Option<u16>,

    /// Strip or replace part of the url, format 'find:replace'
    #[arg(long, default_value = "")]
    strip: String,

    /// Print all HTTP communication
    #[arg(long)]
    trace: bool,

    /// ServiceID and port of a dummy application which will be added to the
    /// list of registered services, example: foo-service:8081
    #[arg(long = "fake")]
    fakes: Vec<String>,

    /// Allow services to register in the real Eureka instance
    #[arg(long)]
    pollute: bool,
}

#[tokio::main]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            process::exit(code);
        }
    };

    if args.version {
        println!("v{}", env!("CARGO_PKG_VERSION"));
        return;
    }

    init_logging(args.trace);

    if let Err(err) = run(args).await {
        eprintln!("{}", err);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), ProxyError> {
    let target = args.target.as_deref().ok_or_else(|| {
        ProxyError::Config("Specify eureka url or valid config file".to_string())
    })?;

    let mut fakes: Vec<FakeApp> = Vec::new();
    let mut config_port = None;

    let eureka_url = match config::resolve_target(target)? {
        TargetArg::Upstream(url) => url,
        TargetArg::Config(file) => {
            let url = file.eureka_url()?;
            config_port = file.port()?;
            fakes.extend(file.fake_apps()?);
            url
        }
    };

    for value in &args.fakes {
        let (service_id, port) = config::parse_id_and_port(value)?;
        fakes.push(FakeApp::local(&service_id, port)?);
    }

    let port = args.port.or(config_port).unwrap_or(DEFAULT_PORT);

    let proxy = ReverseProxy::new(&ProxyConfig {
        routes: RouteConfig::single(&args.strip, eureka_url.clone()),
        port,
        trace: false,
        logging_off: true,
        enable_cors: false,
    })
    .map_err(|err| ProxyError::Config(format!("Unable to initialize proxy, err: {}", err)))?;

    info!("Reverse proxy starting on port {}", port);
    info!("Proxying to {}", eureka_url);
    for fake in &fakes {
        info!("Injecting {}", fake);
    }

    let registry = Arc::new(FakeRegistry::new(fakes, args.pollute));

    let router = proxy
        .into_router()
        .layer(axum::middleware::from_fn_with_state(registry, fake::intercept))
        .layer(axum::middleware::from_fn_with_state(
            AccessLog { trace: args.trace },
            logging::access_log,
        ));

    proxy::serve(router, port)
        .await
        .map_err(|err| ProxyError::Config(format!("Unable to start proxy, err: {}", err)))
}

fn init_logging(trace: bool) {
    let default = if trace { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}
