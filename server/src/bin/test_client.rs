use bincode::{deserialize, serialize};
use shared::{Packet, Request, Response, MAX_PACKET_SIZE};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};

const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Sends one request and waits for the response with the same id
async fn call(
    socket: &UdpSocket,
    server_addr: SocketAddr,
    id: u32,
    request: Request,
) -> Result<Response, Box<dyn std::error::Error>> {
    let data = serialize(&Packet::Request { id, request })?;
    socket.send_to(&data, server_addr).await?;

    let mut buf = vec![0u8; MAX_PACKET_SIZE];
    loop {
        let (len, _) = timeout(REPLY_TIMEOUT, socket.recv_from(&mut buf)).await??;
        match deserialize::<Packet>(&buf[0..len]) {
            Ok(Packet::Response { id: reply_id, response }) if reply_id == id => {
                return Ok(response)
            }
            Ok(other) => println!("Ignoring unexpected packet: {:?}", other),
            Err(e) => println!("Failed to deserialize response: {}", e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Create local socket
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Client socket bound to {}", socket.local_addr()?);

    let server_addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8080".to_string())
        .parse::<SocketAddr>()?;
    let mut next_id = 0u32;
    let mut id = || {
        next_id += 1;
        next_id
    };

    let maps = match call(&socket, server_addr, id(), Request::ListMaps).await? {
        Response::Maps(maps) => maps,
        other => return Err(format!("Unexpected response: {:?}", other).into()),
    };
    println!("Server offers {} maps", maps.len());
    let Some(map) = maps.first() else {
        println!("No maps to join");
        return Ok(());
    };

    let join = Request::Join {
        user_name: "Scout".to_string(),
        map_id: map.id.clone(),
    };
    let token = match call(&socket, server_addr, id(), join).await? {
        Response::Joined {
            auth_token,
            player_id,
        } => {
            println!("Joined '{}' as player {}", map.name, player_id);
            auth_token
        }
        other => return Err(format!("Join failed: {:?}", other).into()),
    };

    // Walk in each direction, advancing time by hand
    for code in ["R", "D", "L", "U", ""] {
        let action = Request::Action {
            token: token.clone(),
            direction: code.to_string(),
        };
        println!("Move '{}': {:?}", code, call(&socket, server_addr, id(), action).await?);

        // Refused when the server runs its own ticker
        let tick = Request::Tick { time_delta: 500 };
        println!("Tick: {:?}", call(&socket, server_addr, id(), tick).await?);

        let state = Request::State {
            token: token.clone(),
        };
        if let Response::State(dogs) = call(&socket, server_addr, id(), state).await? {
            for dog in dogs {
                println!(
                    "  Dog of player {}: pos=({:.2}, {:.2}) vel=({:.2}, {:.2}) dir={}",
                    dog.player_id,
                    dog.position.x,
                    dog.position.y,
                    dog.velocity.vx,
                    dog.velocity.vy,
                    dog.direction.code()
                );
            }
        }

        sleep(Duration::from_millis(200)).await;
    }

    let players = Request::Players { token };
    println!("Players: {:?}", call(&socket, server_addr, id(), players).await?);

    Ok(())
}
