//! UDP request/response adapter in front of the application

use crate::app::AppError;
use crate::model::MapId;
use crate::players::Player;
use crate::strand::{AppHandle, Pending};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{
    is_well_formed_token, DogState, ErrorCode, Move, Packet, PlayerInfo, Request, Response,
    MAX_PACKET_SIZE,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    Shutdown,
}

/// Messages sent from request handlers to the sender task
#[derive(Debug)]
pub enum OutgoingMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
}

/// UDP server translating packets into application calls
pub struct Server {
    socket: Arc<UdpSocket>,
    app: AppHandle,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    outgoing_tx: mpsc::UnboundedSender<OutgoingMessage>,
    outgoing_rx: Option<mpsc::UnboundedReceiver<OutgoingMessage>>,
}

impl Server {
    pub async fn new(addr: &str, app: AppHandle) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            app,
            server_tx,
            server_rx,
            outgoing_tx,
            outgoing_rx: Some(outgoing_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Sender for stopping the server loop from outside
    pub fn shutdown_sender(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_PACKET_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let Some(mut outgoing_rx) = self.outgoing_rx.take() else {
            return;
        };

        tokio::spawn(async move {
            while let Some(OutgoingMessage::SendPacket { packet, addr }) = outgoing_rx.recv().await
            {
                if let Err(e) = send_packet_impl(&socket, &packet, addr).await {
                    error!("Failed to send packet to {}: {}", addr, e);
                }
            }
        });
    }

    /// Queues the packet's command in the region in receive order, then
    /// waits for the reply on its own task so slow requests do not hold up
    /// the receive loop
    async fn handle_packet(&self, packet: Packet, addr: SocketAddr) {
        let (id, request) = match packet {
            Packet::Request { id, request } => (id, request),
            Packet::Response { id, .. } => {
                warn!("Unexpected response packet from client at {}", addr);
                let response = Response::error(ErrorCode::BadRequest, "Bad request");
                self.queue(Packet::Response { id, response }, addr);
                return;
            }
        };

        debug!("Request {} from {}: {:?}", id, addr, request);
        let outcome = dispatch(&self.app, request).await;

        let outgoing_tx = self.outgoing_tx.clone();
        tokio::spawn(async move {
            let response = outcome.into_response().await;
            let packet = Packet::Response { id, response };
            if let Err(e) = outgoing_tx.send(OutgoingMessage::SendPacket { packet, addr }) {
                error!("Failed to queue response for {}: {}", addr, e);
            }
        });
    }

    fn queue(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self
            .outgoing_tx
            .send(OutgoingMessage::SendPacket { packet, addr })
        {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Main server loop
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();

        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::PacketReceived { packet, addr } => {
                    self.handle_packet(packet, addr).await;
                }
                ServerMessage::Shutdown => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

async fn send_packet_impl(
    socket: &UdpSocket,
    packet: &Packet,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = serialize(packet)?;
    socket.send_to(&data, addr).await?;
    Ok(())
}

/// A request that was either answered at once or queued in the region
pub enum Outcome {
    Ready(Response),
    Joined(Pending<Player>),
    Players(Pending<Vec<PlayerInfo>>),
    State(Pending<Vec<DogState>>),
    Ack(Pending<()>),
}

impl Outcome {
    /// Waits for the region's reply and turns it into a response
    pub async fn into_response(self) -> Response {
        let result = match self {
            Outcome::Ready(response) => return response,
            Outcome::Joined(pending) => pending.wait().await.map(|player| Response::Joined {
                auth_token: player.token.to_string(),
                player_id: player.id.0,
            }),
            Outcome::Players(pending) => pending.wait().await.map(Response::Players),
            Outcome::State(pending) => pending.wait().await.map(Response::State),
            Outcome::Ack(pending) => pending.wait().await.map(|()| Response::Ack),
        };
        result.unwrap_or_else(error_response)
    }
}

/// Validates a request and queues its command in the region.
///
/// Returns once the command holds its place in the queue; the reply is
/// awaited through the returned [`Outcome`].
pub async fn dispatch(app: &AppHandle, request: Request) -> Outcome {
    let queued = match request {
        Request::ListMaps => return Outcome::Ready(Response::Maps(app.maps())),

        Request::GetMap { map_id } => {
            return Outcome::Ready(match app.find_map(&MapId::new(map_id)) {
                Some(detail) => Response::Map(detail),
                None => Response::error(ErrorCode::MapNotFound, "Map not found"),
            })
        }

        Request::Join { user_name, map_id } => {
            if user_name.is_empty() {
                return Outcome::Ready(Response::error(ErrorCode::InvalidArgument, "Invalid name"));
            }
            app.queue_join(&user_name, &MapId::new(map_id))
                .await
                .map(Outcome::Joined)
        }

        Request::Players { token } => {
            if let Some(rejection) = check_token(&token) {
                return Outcome::Ready(rejection);
            }
            app.queue_players(&token).await.map(Outcome::Players)
        }

        Request::State { token } => {
            if let Some(rejection) = check_token(&token) {
                return Outcome::Ready(rejection);
            }
            app.queue_state(&token).await.map(Outcome::State)
        }

        Request::Action { token, direction } => {
            if let Some(rejection) = check_token(&token) {
                return Outcome::Ready(rejection);
            }
            let mv = match Move::from_code(&direction) {
                Ok(mv) => mv,
                Err(e) => {
                    debug!("Rejected action: {}", e);
                    return Outcome::Ready(Response::error(
                        ErrorCode::InvalidArgument,
                        "Failed to parse action",
                    ));
                }
            };
            app.queue_velocity(&token, mv).await.map(Outcome::Ack)
        }

        Request::Tick { time_delta } => app.queue_tick(time_delta).await.map(Outcome::Ack),
    };

    queued.unwrap_or_else(|e| Outcome::Ready(error_response(e)))
}

/// Validates a request, runs it against the application and waits for the
/// response
pub async fn handle_request(app: &AppHandle, request: Request) -> Response {
    dispatch(app, request).await.into_response().await
}

fn check_token(token: &str) -> Option<Response> {
    if is_well_formed_token(token) {
        None
    } else {
        Some(Response::error(
            ErrorCode::InvalidToken,
            "Authorization token is malformed",
        ))
    }
}

fn error_response(error: AppError) -> Response {
    match error {
        AppError::MapNotFound(_) => Response::error(ErrorCode::MapNotFound, "Map not found"),
        AppError::UnknownToken => {
            Response::error(ErrorCode::UnknownToken, "Player token has not been found")
        }
        AppError::UnknownSession(_) | AppError::UnknownPlayer(_) => {
            Response::error(ErrorCode::UnknownToken, error.to_string())
        }
        AppError::TickDisabled => Response::error(ErrorCode::BadRequest, "Invalid endpoint"),
        AppError::Unavailable => Response::error(ErrorCode::BadRequest, error.to_string()),
    }
}
