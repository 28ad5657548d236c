//! ChatServer Actor implementation
//!
//! The central actor that owns all shared state: connected clients and the
//! room registry. Sessions only talk to it through the command channel, and
//! it processes one command at a time, so no locks are needed.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::client::{Client, Outbox};
use crate::command::{Command, CommandKind};
use crate::error::AppError;
use crate::message::ServerMessage;
use crate::room::Room;
use crate::types::{ClientId, RoomName};

/// Greeting sent to every new connection
pub const GREETING: &str = "welcome! set a nick with /nick <NAME> and join a room with /join <ROOM-NAME>";

/// Messages sent from sessions to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New client connected
    Connect {
        client_id: ClientId,
        outbox: Outbox,
    },
    /// Parsed client command
    Client(Command),
}

/// The main ChatServer actor
///
/// Single owner of the client table and the room registry.
pub struct ChatServer {
    /// All connected clients: ClientId -> Client
    clients: HashMap<ClientId, Client>,
    /// All known rooms: RoomName -> Room
    rooms: HashMap<RoomName, Room>,
    /// Drop rooms once their last member leaves
    prune_empty_rooms: bool,
    /// Command receiver channel
    receiver: mpsc::UnboundedReceiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::UnboundedReceiver<ServerCommand>) -> Self {
        Self {
            clients: HashMap::new(),
            rooms: HashMap::new(),
            prune_empty_rooms: true,
            receiver,
        }
    }

    /// Keep empty rooms in the registry instead of removing them
    pub fn keep_empty_rooms(mut self, keep: bool) -> Self {
        self.prune_empty_rooms = !keep;
        self
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer stopped");
    }

    /// Process a single command
    pub fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect { client_id, outbox } => self.handle_connect(client_id, outbox),
            ServerCommand::Client(cmd) => {
                let client_id = cmd.origin();
                debug!("Client {} sent {:?} {:?}", client_id, cmd.kind(), cmd.args());
                match cmd.kind() {
                    CommandKind::SetNick => self.handle_set_nick(client_id, cmd.args()),
                    CommandKind::JoinRoom => self.handle_join_room(client_id, cmd.args()),
                    CommandKind::ListRooms => self.handle_list_rooms(client_id),
                    CommandKind::SendMessage => self.handle_send_message(client_id, cmd.args()),
                    CommandKind::Quit => self.handle_quit(client_id),
                    CommandKind::Chat => self.handle_chat(client_id, cmd.args()),
                }
            }
        }
    }

    /// Names of all known rooms, sorted
    pub fn room_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rooms.keys().map(RoomName::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up a room by name
    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.get(&RoomName::new(name))
    }

    /// Look up a connected client
    pub fn client(&self, client_id: ClientId) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    /// Handle new client connection
    fn handle_connect(&mut self, client_id: ClientId, outbox: Outbox) {
        info!("Client {} connected", client_id);
        let client = Client::new(client_id, outbox);
        client.notify(ServerMessage::Info(GREETING.to_string()));
        self.clients.insert(client_id, client);
        debug!(
            "Total clients: {}, Total rooms: {}",
            self.clients.len(),
            self.rooms.len()
        );
    }

    /// Handle nick change
    fn handle_set_nick(&mut self, client_id: ClientId, args: &[String]) {
        let Some(client) = self.clients.get_mut(&client_id) else {
            return;
        };

        let nick = args.join(" ").trim().to_string();
        if nick.is_empty() {
            client.notify(AppError::NickRequired.into());
            return;
        }

        info!("Client {} is now known as '{}'", client_id, nick);
        client.nick = nick;
        client.notify(ServerMessage::Success(format!(
            "all right, i will call you {}",
            client.nick
        )));
    }

    /// Handle room joining, creating the room on first use
    fn handle_join_room(&mut self, client_id: ClientId, args: &[String]) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };

        let [room_name] = args else {
            client.notify(AppError::RoomNameRequired.into());
            return;
        };
        let room_name = RoomName::new(room_name.as_str());

        if client.current_room() == Some(&room_name) {
            client.notify(ServerMessage::Info(format!("you are already in {}", room_name)));
            return;
        }

        self.quit_current_room(client_id);

        let room = self.rooms.entry(room_name.clone()).or_insert_with(|| {
            info!("Room {} created", room_name);
            Room::new(room_name.clone())
        });
        let Some(client) = self.clients.get_mut(&client_id) else {
            return;
        };

        room.add_member(client_id, client.outbox().clone());
        client.set_room(Some(room_name.clone()));
        info!("Client {} joined room {}", client_id, room_name);

        room.broadcast(
            Some(client_id),
            &ServerMessage::Info(format!("{} joined the room", client.nick)),
        );
        client.notify(ServerMessage::Info(format!("welcome to {}", room_name)));
    }

    /// Handle room listing
    fn handle_list_rooms(&self, client_id: ClientId) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };

        client.notify(ServerMessage::Info(format!(
            "available rooms: {}",
            self.room_names().join(", ")
        )));
    }

    /// Handle chat message
    fn handle_send_message(&self, client_id: ClientId, args: &[String]) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };

        let Some(room_name) = client.current_room() else {
            client.notify(AppError::NotInRoom.into());
            return;
        };

        if args.is_empty() {
            client.notify(AppError::MessageRequired.into());
            return;
        }

        let Some(room) = self.rooms.get(room_name) else {
            return;
        };

        let line = format!("{}-> {}", client.nick, args.join(" "));
        let delivered = room.broadcast(Some(client_id), &ServerMessage::Chat(line));
        debug!("Message from {} in {} reached {} members", client_id, room_name, delivered);
    }

    /// Handle a plain line: a message inside a room, unrecognized outside
    fn handle_chat(&self, client_id: ClientId, args: &[String]) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };

        if client.current_room().is_none() {
            client.notify(AppError::NotRecognized.into());
            return;
        }

        self.handle_send_message(client_id, args);
    }

    /// Handle disconnect, explicit or synthesized by the session
    fn handle_quit(&mut self, client_id: ClientId) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };

        client.notify(ServerMessage::Info(
            "you are disconnecting, sad to see you go".to_string(),
        ));

        self.quit_current_room(client_id);

        // Dropping the client drops its outbox, which closes the connection
        // once the session writer drains it.
        self.clients.remove(&client_id);
        info!("Client {} quit", client_id);
        debug!(
            "Total clients: {}, Total rooms: {}",
            self.clients.len(),
            self.rooms.len()
        );
    }

    /// Helper: Remove a client from its room and tell the remaining members
    fn quit_current_room(&mut self, client_id: ClientId) {
        let Some(client) = self.clients.get_mut(&client_id) else {
            return;
        };

        let Some(room_name) = client.current_room().cloned() else {
            return;
        };
        client.set_room(None);

        let Some(room) = self.rooms.get_mut(&room_name) else {
            return;
        };

        room.remove_member(client_id);
        room.broadcast(
            Some(client_id),
            &ServerMessage::Info(format!("{} has left the room", client.nick)),
        );
        info!("Client {} left room {}", client_id, room_name);

        if self.prune_empty_rooms && room.is_empty() {
            self.rooms.remove(&room_name);
            debug!("Room {} deleted (empty)", room_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestClient {
        id: ClientId,
        rx: mpsc::Receiver<ServerMessage>,
    }

    impl TestClient {
        /// Everything queued for this client so far, as plain text
        fn drain(&mut self) -> Vec<String> {
            let mut out = Vec::new();
            while let Ok(msg) = self.rx.try_recv() {
                out.push(msg.text().to_string());
            }
            out
        }
    }

    fn new_server() -> (ChatServer, mpsc::UnboundedSender<ServerCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChatServer::new(rx), tx)
    }

    fn connect(server: &mut ChatServer) -> TestClient {
        let id = ClientId::new();
        let (tx, rx) = mpsc::channel(64);
        server.handle_command(ServerCommand::Connect {
            client_id: id,
            outbox: Outbox::new(tx),
        });
        let mut client = TestClient { id, rx };
        client.drain();
        client
    }

    fn send(server: &mut ChatServer, client: &TestClient, kind: CommandKind, args: &[&str]) {
        let args = args.iter().map(|s| s.to_string()).collect();
        server.handle_command(ServerCommand::Client(Command::new(kind, client.id, args)));
    }

    #[test]
    fn test_connect_sends_greeting() {
        let (mut server, _tx) = new_server();
        let id = ClientId::new();
        let (tx, mut rx) = mpsc::channel(4);

        server.handle_command(ServerCommand::Connect {
            client_id: id,
            outbox: Outbox::new(tx),
        });

        assert_eq!(rx.try_recv().unwrap(), ServerMessage::Info(GREETING.to_string()));
        assert_eq!(server.client(id).unwrap().nick, "Anonymous");
    }

    #[test]
    fn test_set_nick() {
        let (mut server, _tx) = new_server();
        let mut a = connect(&mut server);

        send(&mut server, &a, CommandKind::SetNick, &["Jane", "Doe"]);

        assert_eq!(server.client(a.id).unwrap().nick, "Jane Doe");
        assert_eq!(a.drain(), ["all right, i will call you Jane Doe"]);
    }

    #[test]
    fn test_blank_nick_keeps_previous() {
        let (mut server, _tx) = new_server();
        let mut a = connect(&mut server);
        let mut b = connect(&mut server);
        send(&mut server, &a, CommandKind::JoinRoom, &["lobby"]);
        send(&mut server, &b, CommandKind::JoinRoom, &["lobby"]);
        send(&mut server, &a, CommandKind::SetNick, &["A"]);
        a.drain();
        b.drain();

        send(&mut server, &a, CommandKind::SetNick, &[" ", "\t"]);
        send(&mut server, &a, CommandKind::SetNick, &[]);

        assert_eq!(server.client(a.id).unwrap().nick, "A");
        assert_eq!(a.drain(), ["you must provide a nick", "you must provide a nick"]);
        assert!(b.drain().is_empty());
    }

    #[test]
    fn test_join_creates_room_once() {
        let (mut server, _tx) = new_server();
        let mut a = connect(&mut server);
        let mut b = connect(&mut server);

        send(&mut server, &a, CommandKind::JoinRoom, &["lobby"]);
        send(&mut server, &b, CommandKind::JoinRoom, &["lobby"]);

        assert_eq!(server.room_names(), ["lobby"]);
        let lobby = server.room("lobby").unwrap();
        assert_eq!(lobby.member_count(), 2);
        assert!(lobby.contains(a.id) && lobby.contains(b.id));

        assert_eq!(a.drain(), ["welcome to lobby", "Anonymous joined the room"]);
        assert_eq!(b.drain(), ["welcome to lobby"]);
    }

    #[test]
    fn test_join_requires_exactly_one_name() {
        let (mut server, _tx) = new_server();
        let mut a = connect(&mut server);

        send(&mut server, &a, CommandKind::JoinRoom, &[]);
        send(&mut server, &a, CommandKind::JoinRoom, &["two", "words"]);

        assert!(server.room_names().is_empty());
        assert!(server.client(a.id).unwrap().current_room().is_none());
        assert_eq!(
            a.drain(),
            [
                "room name is required. usage: /join <ROOM-NAME>",
                "room name is required. usage: /join <ROOM-NAME>"
            ]
        );
    }

    #[test]
    fn test_join_same_room_is_noop() {
        let (mut server, _tx) = new_server();
        let mut a = connect(&mut server);
        let mut b = connect(&mut server);
        send(&mut server, &a, CommandKind::JoinRoom, &["lobby"]);
        send(&mut server, &b, CommandKind::JoinRoom, &["lobby"]);
        a.drain();
        b.drain();

        send(&mut server, &a, CommandKind::JoinRoom, &["lobby"]);

        assert_eq!(a.drain(), ["you are already in lobby"]);
        assert!(b.drain().is_empty());
        assert_eq!(server.room("lobby").unwrap().member_count(), 2);
    }

    #[test]
    fn test_switching_rooms() {
        let (mut server, _tx) = new_server();
        let mut a = connect(&mut server);
        let mut b = connect(&mut server);
        let mut c = connect(&mut server);
        send(&mut server, &a, CommandKind::SetNick, &["A"]);
        send(&mut server, &a, CommandKind::JoinRoom, &["red"]);
        send(&mut server, &b, CommandKind::JoinRoom, &["red"]);
        send(&mut server, &c, CommandKind::JoinRoom, &["blue"]);
        a.drain();
        b.drain();
        c.drain();

        send(&mut server, &a, CommandKind::JoinRoom, &["blue"]);

        assert!(!server.room("red").unwrap().contains(a.id));
        assert!(server.room("blue").unwrap().contains(a.id));
        assert_eq!(
            server.client(a.id).unwrap().current_room(),
            Some(&RoomName::new("blue"))
        );
        assert_eq!(b.drain(), ["A has left the room"]);
        assert_eq!(c.drain(), ["A joined the room"]);
        assert_eq!(a.drain(), ["welcome to blue"]);
    }

    #[test]
    fn test_empty_rooms_are_pruned() {
        let (mut server, _tx) = new_server();
        let a = connect(&mut server);

        send(&mut server, &a, CommandKind::JoinRoom, &["red"]);
        send(&mut server, &a, CommandKind::JoinRoom, &["blue"]);

        assert_eq!(server.room_names(), ["blue"]);
    }

    #[test]
    fn test_empty_rooms_can_be_kept() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut server = ChatServer::new(rx).keep_empty_rooms(true);
        let a = connect(&mut server);

        send(&mut server, &a, CommandKind::JoinRoom, &["red"]);
        send(&mut server, &a, CommandKind::Quit, &[]);

        assert_eq!(server.room_names(), ["red"]);
        assert!(server.room("red").unwrap().is_empty());
        drop(tx);
    }

    #[test]
    fn test_list_rooms() {
        let (mut server, _tx) = new_server();
        let mut a = connect(&mut server);
        let b = connect(&mut server);

        send(&mut server, &a, CommandKind::ListRooms, &[]);
        send(&mut server, &b, CommandKind::JoinRoom, &["zeta"]);
        send(&mut server, &a, CommandKind::JoinRoom, &["alpha"]);
        a.drain();
        send(&mut server, &a, CommandKind::ListRooms, &[]);

        let out = a.drain();
        assert_eq!(out, ["available rooms: alpha, zeta"]);
    }

    #[test]
    fn test_list_rooms_when_empty() {
        let (mut server, _tx) = new_server();
        let mut a = connect(&mut server);

        send(&mut server, &a, CommandKind::ListRooms, &[]);

        assert_eq!(a.drain(), ["available rooms: "]);
    }

    #[test]
    fn test_message_requires_room() {
        let (mut server, _tx) = new_server();
        let mut a = connect(&mut server);

        send(&mut server, &a, CommandKind::SendMessage, &["hi"]);

        assert_eq!(a.drain(), ["you need to join a room before sending messages"]);
    }

    #[test]
    fn test_message_requires_text() {
        let (mut server, _tx) = new_server();
        let mut a = connect(&mut server);
        let mut b = connect(&mut server);
        send(&mut server, &a, CommandKind::JoinRoom, &["lobby"]);
        send(&mut server, &b, CommandKind::JoinRoom, &["lobby"]);
        a.drain();
        b.drain();

        send(&mut server, &a, CommandKind::SendMessage, &[]);

        assert_eq!(a.drain(), ["message is required. usage: /msg <MSG>"]);
        assert!(b.drain().is_empty());
    }

    #[test]
    fn test_plain_line_outside_room_not_recognized() {
        let (mut server, _tx) = new_server();
        let mut a = connect(&mut server);

        send(&mut server, &a, CommandKind::Chat, &["hello"]);

        assert_eq!(
            a.drain(),
            ["command not recognized. join a room with /join <ROOM-NAME> to chat"]
        );
    }

    #[test]
    fn test_plain_line_right_after_join_is_delivered() {
        let (mut server, _tx) = new_server();
        let mut a = connect(&mut server);
        let mut b = connect(&mut server);
        send(&mut server, &b, CommandKind::JoinRoom, &["lobby"]);
        b.drain();

        // Both commands queued back to back, handled in arrival order
        send(&mut server, &a, CommandKind::JoinRoom, &["lobby"]);
        send(&mut server, &a, CommandKind::Chat, &["hello  there"]);

        assert_eq!(a.drain(), ["welcome to lobby"]);
        assert_eq!(b.drain(), ["Anonymous joined the room", "Anonymous-> hello  there"]);
    }

    #[test]
    fn test_message_only_reaches_same_room() {
        let (mut server, _tx) = new_server();
        let mut a = connect(&mut server);
        let mut b = connect(&mut server);
        let mut c = connect(&mut server);
        let mut d = connect(&mut server);
        send(&mut server, &a, CommandKind::SetNick, &["A"]);
        for client in [&a, &b, &c] {
            send(&mut server, client, CommandKind::JoinRoom, &["lobby"]);
        }
        send(&mut server, &d, CommandKind::JoinRoom, &["elsewhere"]);
        for client in [&mut a, &mut b, &mut c, &mut d] {
            client.drain();
        }

        send(&mut server, &a, CommandKind::SendMessage, &["hello", "all"]);

        assert_eq!(b.drain(), ["A-> hello all"]);
        assert_eq!(c.drain(), ["A-> hello all"]);
        assert!(a.drain().is_empty());
        assert!(d.drain().is_empty());
    }

    #[test]
    fn test_lobby_scenario() {
        let (mut server, _tx) = new_server();
        let mut a = connect(&mut server);
        let mut b = connect(&mut server);
        send(&mut server, &a, CommandKind::SetNick, &["A"]);
        send(&mut server, &a, CommandKind::JoinRoom, &["lobby"]);
        send(&mut server, &b, CommandKind::JoinRoom, &["lobby"]);
        a.drain();
        b.drain();

        send(&mut server, &a, CommandKind::SendMessage, &["hi"]);
        assert_eq!(b.drain(), ["A-> hi"]);
        assert!(!a.drain().iter().any(|line| line == "A-> hi"));

        send(&mut server, &a, CommandKind::Quit, &[]);
        assert_eq!(b.drain(), ["A has left the room"]);
        assert_eq!(a.drain(), ["you are disconnecting, sad to see you go"]);

        let lobby = server.room("lobby").unwrap();
        assert_eq!(lobby.member_count(), 1);
        assert!(lobby.contains(b.id));
        assert!(server.client(a.id).is_none());

        // The outbox is gone, so the session writer will see the channel close
        assert!(matches!(
            a.rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_commands_after_quit_are_ignored() {
        let (mut server, _tx) = new_server();
        let a = connect(&mut server);

        send(&mut server, &a, CommandKind::Quit, &[]);
        send(&mut server, &a, CommandKind::Quit, &[]);
        send(&mut server, &a, CommandKind::JoinRoom, &["lobby"]);

        assert!(server.room_names().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_sessions_leave_no_stale_members() {
        let (tx, rx) = mpsc::unbounded_channel();
        let server = tokio::spawn(ChatServer::new(rx).run());

        let mut tasks = Vec::new();
        for i in 0..8 {
            let tx = tx.clone();
            tasks.push(tokio::spawn(async move {
                let id = ClientId::new();
                let (out_tx, mut out_rx) = mpsc::channel(1024);
                tx.send(ServerCommand::Connect {
                    client_id: id,
                    outbox: Outbox::new(out_tx),
                })
                .unwrap();

                for round in 0..10 {
                    let room = if (i + round) % 2 == 0 { "even" } else { "odd" };
                    let cmds = [
                        Command::new(CommandKind::JoinRoom, id, vec![room.to_string()]),
                        Command::new(CommandKind::SendMessage, id, vec![format!("{i}:{round}")]),
                    ];
                    for cmd in cmds {
                        tx.send(ServerCommand::Client(cmd)).unwrap();
                    }
                    tokio::task::yield_now().await;
                }
                tx.send(ServerCommand::Client(Command::quit(id))).unwrap();

                // Drain until the dispatcher drops our outbox
                while out_rx.recv().await.is_some() {}
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let id = ClientId::new();
        let (out_tx, mut out_rx) = mpsc::channel(8);
        tx.send(ServerCommand::Connect {
            client_id: id,
            outbox: Outbox::new(out_tx),
        })
        .unwrap();
        tx.send(ServerCommand::Client(Command::new(CommandKind::ListRooms, id, Vec::new())))
            .unwrap();

        assert_eq!(out_rx.recv().await.unwrap().text(), GREETING);
        assert_eq!(out_rx.recv().await.unwrap().text(), "available rooms: ");

        drop(tx);
        server.await.unwrap();
    }
}
