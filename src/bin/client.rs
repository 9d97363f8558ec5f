//! RFT 클라이언트 - Reliable File Transfer
//!
//! stop-and-wait 방식으로 파일 하나를 UDP 서버에 전송
//! - 일반 모드(nm): 재전송 없음, 모든 이상은 즉시 실패
//! - 타임아웃 모드(wt): ACK 타임아웃 시 제한 재전송 + 체크섬 손상 시뮬레이션
//!
//! 사용법:
//!   cargo run --release --bin rft-client -- [OPTIONS]
//!
//! 예시:
//!   # 기본 전송
//!   cargo run --release --bin rft-client -- -i data.bin -s 127.0.0.1 -p 50001
//!
//!   # 타임아웃 모드 + 10% 손상
//!   cargo run --release --bin rft-client -- -i data.bin -o copy.bin -m wt -l 0.1

use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rft::{Config, TransferMode};

/// 클라이언트 설정
#[derive(Default)]
struct ClientConfig {
    input: Option<PathBuf>,
    config: Config,
}

/// 옵션 값 파싱, 실패 시 종료
fn parse_value<T: FromStr>(args: &[String], i: usize, name: &str) -> T {
    match args.get(i + 1).map(|v| v.parse::<T>()) {
        Some(Ok(value)) => value,
        Some(Err(_)) => {
            eprintln!("{}: 유효하지 않은 값 '{}'", name, args[i + 1]);
            process::exit(2);
        }
        None => {
            eprintln!("{}: 값 필요", name);
            process::exit(2);
        }
    }
}

fn print_help() {
    println!(
        r#"RFT Client - Reliable File Transfer 클라이언트

UDP stop-and-wait 파일 전송
- 세그먼트마다 ACK 확인, 시퀀스/체크섬/피어 검증
- 타임아웃 모드에서 ACK 타임아웃 시 제한 재전송

사용법:
  cargo run --release --bin rft-client -- [OPTIONS]

옵션:
  -i, --input <PATH>     전송할 파일 (필수)
  -o, --output <NAME>    서버측 저장 이름 (기본: 입력 파일 이름)
  -s, --server <ADDR>    서버 IPv4 주소 (기본: 127.0.0.1)
  -p, --port <PORT>      서버 포트 (기본: 50001)
  -m, --mode <nm|wt>     전송 모드 (기본: nm)
  -l, --loss <PROB>      체크섬 손상 확률 0.0~1.0 (wt 전용, 기본: 0.0)
  -t, --timeout <SECS>   ACK 타임아웃 초 (wt 전용, 기본: 2)
  -r, --retries <N>      최대 재전송 횟수 (wt 전용, 기본: 4)
  -h, --help             이 도움말 출력

예시:
  cargo run --release --bin rft-client -- -i data.bin -s 192.168.1.100 -p 50001
  cargo run --release --bin rft-client -- -i data.bin -m wt -l 0.2 -r 8
"#
    );
}

fn parse_args() -> ClientConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut client = ClientConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" | "-i" => {
                client.input = Some(parse_value::<PathBuf>(&args, i, "--input"));
                i += 1;
            }
            "--output" | "-o" => {
                client.config.out_fname = parse_value::<String>(&args, i, "--output");
                i += 1;
            }
            "--server" | "-s" => {
                client.config.server_host = parse_value::<String>(&args, i, "--server");
                i += 1;
            }
            "--port" | "-p" => {
                client.config.server_port = parse_value::<u16>(&args, i, "--port");
                i += 1;
            }
            "--mode" | "-m" => {
                client.config.mode = parse_value::<TransferMode>(&args, i, "--mode");
                i += 1;
            }
            "--loss" | "-l" => {
                client.config.loss_prob = parse_value::<f32>(&args, i, "--loss");
                i += 1;
            }
            "--timeout" | "-t" => {
                let secs = parse_value::<f64>(&args, i, "--timeout");
                client.config.timeout = match Duration::try_from_secs_f64(secs) {
                    Ok(timeout) => timeout,
                    Err(_) => {
                        eprintln!("--timeout: 유효하지 않은 값 '{}'", secs);
                        process::exit(2);
                    }
                };
                i += 1;
            }
            "--retries" | "-r" => {
                client.config.max_retries = parse_value::<u32>(&args, i, "--retries");
                i += 1;
            }
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            other => {
                eprintln!("알 수 없는 옵션: {}", other);
                process::exit(2);
            }
        }
        i += 1;
    }

    client.config = client.config.validate();
    client
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let client = parse_args();
    let input = match client.input {
        Some(path) => path,
        None => {
            eprintln!("--input 필요 (--help 참고)");
            process::exit(2);
        }
    };

    info!("RFT Client starting...");
    info!(
        "Server: {}:{} | Mode: {} | Loss: {} | Timeout: {:?} | Retries: {}",
        client.config.server_host,
        client.config.server_port,
        client.config.mode,
        client.config.loss_prob,
        client.config.timeout,
        client.config.max_retries,
    );

    match rft::send_file(client.config, &input) {
        Ok(stats) => {
            info!("전송 성공: {}", stats.summary());
            Ok(())
        }
        Err(e) => {
            error!("전송 실패: {}", e);
            process::exit(1);
        }
    }
}
