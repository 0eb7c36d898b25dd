//! 전송 세션 관리
//!
//! - 서버: 요청 수신 → 소스 검증 → 총 프레임 수 알림 → 송신 엔진 실행
//! - 클라이언트: 요청 전송 (재시도) → 총 프레임 수 수신 → 수신 엔진 실행
//!
//! 서버는 한 번에 요청 하나를 끝까지 처리한다.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::loss::LossSimulator;
use crate::message::{ControlMessage, MessageKind, Request, TransferRequest};
use crate::receiver::Receiver;
use crate::sender::Sender;
use crate::stats::TransferStats;
use crate::transport::Link;
use crate::{Config, Error, Result, FRAME_SIZE, MAX_PAYLOAD};

/// 바이트 크기 → 프레임 수 (올림)
pub fn frame_count(size: u64) -> u64 {
    (size + MAX_PAYLOAD as u64 - 1) / MAX_PAYLOAD as u64
}

/// 경로 구성요소 없는 단일 파일명인지 확인
///
/// 서버는 제공 디렉토리, 클라이언트는 출력 디렉토리 밖을 건드리지 않는다.
pub fn is_plain_file_name(name: &str) -> bool {
    !(name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']))
}

/// 수락된 전송 세션
#[derive(Debug, Clone)]
pub struct Session {
    pub request: TransferRequest,

    /// 실제 소스 경로
    pub path: PathBuf,

    /// 소스 크기 (바이트)
    pub size: u64,

    /// 총 프레임 수 (≥ 1)
    pub total_frames: u32,
}

impl Session {
    /// 요청 파일 검증 후 세션 생성
    ///
    /// 프레임을 보내기 전에 실패하므로 부분 상태가 남지 않는다.
    pub async fn open(root: &Path, request: TransferRequest) -> Result<(Self, File)> {
        let path = root.join(&request.file_name);
        let unavailable = |reason: &str| Error::SourceUnavailable {
            path: path.clone(),
            reason: reason.to_string(),
        };

        // 서버 디렉토리 밖 접근 차단
        if !is_plain_file_name(&request.file_name) {
            return Err(unavailable("파일명에 경로 구성요소 불가"));
        }

        let file = File::open(&path)
            .await
            .map_err(|e| unavailable(&e.to_string()))?;
        let metadata = file
            .metadata()
            .await
            .map_err(|e| unavailable(&e.to_string()))?;

        if !metadata.is_file() {
            return Err(unavailable("일반 파일 아님"));
        }

        let size = metadata.len();
        if size == 0 {
            return Err(Error::EmptySource { path });
        }

        let total_frames =
            u32::try_from(frame_count(size)).map_err(|_| unavailable("파일이 너무 큼"))?;

        let session = Self {
            request,
            path,
            size,
            total_frames,
        };
        Ok((session, file))
    }
}

/// 파일 제공 서버
pub struct Server {
    config: Config,
    socket: Arc<UdpSocket>,
}

impl Server {
    /// 서버 소켓 바인딩
    pub async fn bind(config: Config, bind_addr: SocketAddr) -> Result<Self> {
        let socket = Arc::new(UdpSocket::bind(bind_addr).await?);
        info!("ARQFT Server started on {}", socket.local_addr()?);
        Ok(Self { config, socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// EXIT 요청까지 요청 처리
    ///
    /// 세션 실패는 로그만 남기고 다음 요청을 기다린다.
    pub async fn serve(&self) -> Result<()> {
        let mut buf = vec![0u8; FRAME_SIZE];

        loop {
            // 제어 채널: 타임아웃 없이 대기
            let (len, addr) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    warn!("수신 에러: {}", e);
                    continue;
                }
            };

            if MessageKind::classify(len) != MessageKind::Request {
                debug!("요청이 아닌 datagram 무시: {} bytes from {}", len, addr);
                continue;
            }

            match Request::from_bytes(&buf[..len]) {
                Ok(Request::Exit) => {
                    info!("EXIT 수신: {}", addr);
                    return Ok(());
                }
                Ok(Request::Transfer(request)) => {
                    info!("요청 수신 from {}: {}", addr, request);
                    match self.handle_transfer(request, addr).await {
                        Ok(stats) => info!("세션 완료: {}", stats.sender_summary()),
                        Err(e) => warn!("세션 종료: {}", e),
                    }
                }
                Err(e) => {
                    warn!("요청 거부 from {}: {}", addr, e);
                    let link = Link::new(self.socket.clone(), addr);
                    if let Err(e) = link.send(&ControlMessage::reject().to_bytes()?).await {
                        warn!("거부 알림 전송 실패: {}", e);
                    }
                }
            }
        }
    }

    /// 요청 하나 처리
    pub async fn handle_transfer(
        &self,
        request: TransferRequest,
        peer: SocketAddr,
    ) -> Result<TransferStats> {
        let link = Link::new(self.socket.clone(), peer);

        let (session, file) = match Session::open(&self.config.root_dir, request).await {
            Ok(opened) => opened,
            Err(e) => {
                link.send(&ControlMessage::reject().to_bytes()?).await?;
                return Err(e);
            }
        };

        info!(
            "세션 시작: {:?} ({} bytes, {} frames, {}, loss {}%)",
            session.path,
            session.size,
            session.total_frames,
            session.request.variant,
            session.request.loss_percent
        );

        link.send(&ControlMessage::frame_count(session.total_frames).to_bytes()?)
            .await?;

        let loss = LossSimulator::from_seed(session.request.loss_percent, self.config.loss_seed);
        let mut sender = Sender::new(self.config.clone(), link, BufReader::new(file), loss)
            .with_source_path(&session.path);

        sender
            .run(session.request.variant, session.total_frames)
            .await
    }
}

/// 파일 요청 클라이언트
pub struct Client {
    config: Config,
    link: Link,
}

impl Client {
    /// 로컬 소켓 바인딩 후 서버 주소 고정
    pub async fn connect(
        config: Config,
        bind_addr: SocketAddr,
        server_addr: SocketAddr,
    ) -> Result<Self> {
        let socket = Arc::new(UdpSocket::bind(bind_addr).await?);
        info!(
            "ARQFT Client bound to {}, server: {}",
            socket.local_addr()?,
            server_addr
        );

        Ok(Self {
            config,
            link: Link::new(socket, server_addr),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.link.socket().local_addr()?)
    }

    /// 파일 요청 후 싱크로 수신
    pub async fn request<W>(&self, request: &TransferRequest, sink: W) -> Result<TransferStats>
    where
        W: AsyncWrite + Unpin,
    {
        let total_frames = self.negotiate(request).await?;
        self.receive(total_frames, sink).await
    }

    /// 파일 요청 후 `output_dir/<파일명>`에 저장
    ///
    /// 서버가 요청을 수락한 뒤에만 출력 파일을 만든다.
    /// 거부되면 기존 로컬 파일은 그대로 남는다.
    pub async fn download(
        &self,
        request: &TransferRequest,
        output_dir: &Path,
    ) -> Result<(PathBuf, TransferStats)> {
        if !is_plain_file_name(&request.file_name) {
            return Err(Error::InvalidRequest(format!(
                "파일명에 경로 구성요소 불가: {:?}",
                request.file_name
            )));
        }

        let total_frames = self.negotiate(request).await?;

        let path = output_dir.join(&request.file_name);
        let mut writer = BufWriter::new(File::create(&path).await?);
        let result = self.receive(total_frames, &mut writer).await;
        writer.flush().await?;

        match result {
            Ok(stats) => {
                info!("Data saved to {:?}", path);
                Ok((path, stats))
            }
            Err(e) => {
                warn!("불완전한 파일이 남음: {:?}", path);
                Err(e)
            }
        }
    }

    /// 총 프레임 수를 받은 뒤 수신 엔진 실행
    pub async fn receive<W>(&self, total_frames: u32, sink: W) -> Result<TransferStats>
    where
        W: AsyncWrite + Unpin,
    {
        info!("총 프레임 수: {}", total_frames);
        let mut receiver = Receiver::new(self.config.clone(), self.link.clone(), sink);
        receiver.run(total_frames).await
    }

    /// 서버 루프 종료 요청
    pub async fn exit(&self) -> Result<()> {
        self.link.send(&Request::Exit.to_bytes()?).await?;
        info!("EXIT 전송");
        Ok(())
    }

    /// 요청 전송 후 총 프레임 수 대기 (응답 없으면 재전송)
    ///
    /// 총 프레임 수 0은 [`Error::Rejected`]로 반환한다.
    pub async fn negotiate(&self, request: &TransferRequest) -> Result<u32> {
        let bytes = Request::Transfer(request.clone()).to_bytes()?;
        let retries = self.config.request_retries.max(1);
        let mut buf = vec![0u8; FRAME_SIZE];

        for attempt in 1..=retries {
            if attempt > 1 {
                info!("Retry #{}: 총 프레임 수 대기 중...", attempt - 1);
            }
            self.link.send(&bytes).await?;

            let deadline = Instant::now() + self.config.request_timeout();
            while let Some(len) = self.link.recv_until(&mut buf, deadline).await? {
                match ControlMessage::from_bytes(&buf[..len]) {
                    Some(msg) if msg.value == 0 => {
                        return Err(Error::Rejected {
                            file_name: request.file_name.clone(),
                        });
                    }
                    Some(msg) => return Ok(msg.value),
                    None => debug!("이전 세션 datagram 무시: {} bytes", len),
                }
            }
        }

        Err(Error::NoResponse { attempts: retries })
    }
}
