//! ARQFT 클라이언트 (요청 / 수신측)
//!
//! 요청 한 줄 `<1|2> <파일명> <손실%>` 입력마다 파일 하나 수신
//! - 1: Stop-and-Wait, 2: Go-Back-N
//! - EXIT: 서버 종료 요청 후 클라이언트 종료
//!
//! 사용법:
//!   cargo run --release --bin arqft-client -- [OPTIONS]
//!
//! 예시:
//!   # 대화형
//!   cargo run --release --bin arqft-client -- --server 127.0.0.1:2226 --output ./downloads
//!
//!   # 요청 하나만 처리
//!   cargo run --release --bin arqft-client -- -s localhost:2226 --request "2 report.txt 10"

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use arqft::{Client, Config, Request, DEFAULT_PORT};

/// 클라이언트 설정
struct ClientConfig {
    bind_addr: SocketAddr,
    server: String,
    output_dir: PathBuf,
    request: Option<String>,
    config: Config,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            server: format!("127.0.0.1:{}", DEFAULT_PORT),
            output_dir: PathBuf::from("."),
            request: None,
            config: Config::default(),
        }
    }
}

fn parse_args() -> ClientConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = ClientConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    config.bind_addr = args[i + 1].parse().expect("유효한 주소 필요");
                    i += 1;
                }
            }
            "--server" | "-s" => {
                if i + 1 < args.len() {
                    config.server = args[i + 1].clone();
                    i += 1;
                }
            }
            "--output" | "-o" => {
                if i + 1 < args.len() {
                    config.output_dir = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--request" | "-r" => {
                if i + 1 < args.len() {
                    config.request = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--idle-timeout-ms" => {
                if i + 1 < args.len() {
                    config.config.idle_timeout_ms = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!(
                    r#"ARQFT Client - ARQ File Transfer 클라이언트

서버에 파일을 요청하고 Stop-and-Wait 또는 Go-Back-N으로 수신

사용법:
  cargo run --release --bin arqft-client -- [OPTIONS]

옵션:
  -b, --bind <ADDR>          로컬 바인드 주소 (기본: 0.0.0.0:0 = 자동 할당)
  -s, --server <HOST:PORT>   서버 주소 (기본: 127.0.0.1:{port})
  -o, --output <DIR>         수신 파일 저장 디렉토리 (기본: .)
  -r, --request <LINE>       요청 하나만 처리 (예: "1 report.txt 10")
  --idle-timeout-ms <MS>     수신 유휴 타임아웃, 0이면 무한 (기본: 30000)
  -h, --help                 이 도움말 출력

요청 형식:
  <1|2> <파일명> <손실%>     1 = Stop-and-Wait, 2 = Go-Back-N
  EXIT                       서버 종료
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

/// 입력 한 줄 처리, EXIT이면 false
async fn handle_line(client: &Client, line: &str, output_dir: &Path) -> bool {
    match Request::parse(line) {
        Ok(Request::Exit) => {
            if let Err(e) = client.exit().await {
                error!("EXIT 전송 실패: {}", e);
            }
            false
        }
        Ok(Request::Transfer(request)) => {
            match client.download(&request, output_dir).await {
                Ok((_, stats)) => info!("Transfer complete: {}", stats.receiver_summary()),
                Err(e) => error!("Transfer failed: {}", e),
            }
            true
        }
        Err(e) => {
            warn!("{}", e);
            true
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let client_config = parse_args();

    // 호스트명 해석
    let server_addr = tokio::net::lookup_host(&client_config.server)
        .await?
        .next()
        .ok_or("서버 주소 해석 실패")?;

    info!("ARQFT Client starting...");
    info!("Server address: {}", server_addr);
    info!("Output directory: {:?}", client_config.output_dir);

    let client = Client::connect(client_config.config, client_config.bind_addr, server_addr).await?;

    if let Some(line) = &client_config.request {
        handle_line(&client, line, &client_config.output_dir).await;
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("ARQFT> ");
        std::io::Write::flush(&mut std::io::stdout())?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        if !handle_line(&client, &line, &client_config.output_dir).await {
            break;
        }
    }

    Ok(())
}
