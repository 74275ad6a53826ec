use std::process;

use clap::Parser;

use eureka_proxy::config::{self, TargetArg};
use eureka_proxy::proxy::{ProxyConfig, ReverseProxy, RouteConfig};
use eureka_proxy::ProxyError;

const DEFAULT_PORT: u16 = 4400;

/// Generic path-prefix reverse proxy sharing the eureka-proxy plumbing.
#[derive(Debug, Parser)]
#[command(
    name = "reverse-proxy",
    disable_version_flag = true,
    after_help = "example:\n        reverse-proxy http://internal-gateway.net:8888"
)]
struct Args {
    /// URL to proxy against or path to a YAML routes configuration
    target: Option<String>,

    /// Print version and exit
    #[arg(short = 'v', long = "version")]
    version: bool,

    /// Proxy port
    #[arg(long)]
    port: Option<u16>,

    /// Strip or replace part of the url, format 'find:replace'
    #[arg(long, default_value = "")]
    strip: String,

    /// Trace proxied requests
    #[arg(long)]
    trace: bool,

    /// Enable CORS requests
    #[arg(long = "enable-cors")]
    enable_cors: bool,
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
        ProxyError::Config("Specify url to proxy against or valid config file".to_string())
    })?;

    let routes = match config::resolve_target(target)? {
        TargetArg::Upstream(url) => RouteConfig::single(&args.strip, url),
        TargetArg::Config(file) => file.route_configs()?,
    };
    if routes.is_empty() {
        return Err(ProxyError::Config(
            "no routes configured, specify at least one route".to_string(),
        ));
    }

    let proxy = ReverseProxy::new(&ProxyConfig {
        routes,
        port: args.port.unwrap_or(DEFAULT_PORT),
        trace: args.trace,
        logging_off: false,
        enable_cors: args.enable_cors,
    })
    .map_err(|err| ProxyError::Config(format!("Unable to start proxy, err: {}", err)))?;

    proxy.start().await
}

fn init_logging(trace: bool) {
    let default = if trace { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}
