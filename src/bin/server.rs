//! ARQFT 서버 (파일 제공측)
//!
//! 요청을 하나씩 받아 Stop-and-Wait 또는 Go-Back-N으로 파일 전송
//! EXIT 요청을 받으면 종료
//!
//! 사용법:
//!   cargo run --release --bin arqft-server -- [OPTIONS]
//!
//! 예시:
//!   # 현재 디렉토리 파일 제공
//!   cargo run --release --bin arqft-server -- --bind 0.0.0.0:2226
//!
//!   # 윈도우 8, 타임아웃 500ms, 재현 가능한 손실 패턴
//!   cargo run --release --bin arqft-server -- -r ./files --window 8 --timeout-ms 500 --seed 42

use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use arqft::{Config, Server, DEFAULT_PORT};

/// 서버 설정
struct ServerConfig {
    bind_addr: SocketAddr,
    config: Config,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            config: Config::default(),
        }
    }
}

fn parse_args() -> ServerConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = ServerConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    config.bind_addr = args[i + 1].parse().expect("유효한 주소 필요");
                    i += 1;
                }
            }
            "--root" | "-r" => {
                if i + 1 < args.len() {
                    config.config.root_dir = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--window" | "-w" => {
                if i + 1 < args.len() {
                    config.config.window_size = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--timeout-ms" => {
                if i + 1 < args.len() {
                    config.config.ack_timeout_ms = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--retries" => {
                if i + 1 < args.len() {
                    config.config.retry_limit = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--seed" => {
                if i + 1 < args.len() {
                    config.config.loss_seed = Some(args[i + 1].parse().expect("유효한 숫자 필요"));
                    i += 1;
                }
            }
            "--lossy" => {
                let root_dir = config.config.root_dir.clone();
                config.config = Config {
                    root_dir,
                    ..Config::lossy_network()
                };
            }
            "--help" | "-h" => {
                println!(
                    r#"ARQFT Server - ARQ File Transfer 서버

요청받은 파일을 Stop-and-Wait 또는 Go-Back-N으로 전송
- 송신측 손실 시뮬레이션 (요청마다 손실률 지정)
- EXIT 요청 수신 시 종료

사용법:
  cargo run --release --bin arqft-server -- [OPTIONS]

옵션:
  -b, --bind <ADDR>       바인드 주소 (기본: 0.0.0.0:{port})
  -r, --root <DIR>        제공할 파일 디렉토리 (기본: .)
  -w, --window <N>        Go-Back-N 윈도우 크기 (기본: 4)
  --timeout-ms <MS>       ACK 타임아웃 (기본: 2000)
  --retries <N>           프레임/윈도우당 최대 시도 (기본: 5)
  --seed <N>              손실 시뮬레이터 시드 (기본: OS 엔트로피)
  --lossy                 손실 많은 환경용 프리셋
  -h, --help              이 도움말 출력
"#,
                    port = DEFAULT_PORT
                );
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let server_config = parse_args();

    info!("ARQFT Server starting...");
    info!("Bind address: {}", server_config.bind_addr);
    info!("Root directory: {:?}", server_config.config.root_dir);
    info!("Window size: {}", server_config.config.window_size);
    info!("ACK timeout: {}ms", server_config.config.ack_timeout_ms);
    info!("Retry limit: {}", server_config.config.retry_limit);

    let server = Server::bind(server_config.config, server_config.bind_addr).await?;

    info!("Waiting for requests...");
    server.serve().await?;

    info!("Server stopped");
    Ok(())
}
