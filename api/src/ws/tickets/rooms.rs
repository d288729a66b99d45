//! One room per ticket, named `ticket:{id}`. A connection sits in at most one of them.

use util::ws::{PoolError, Socket, SocketPool};

const ROOM_PREFIX: &str = "ticket";
const CURRENT_TICKET_KEY: &str = "ticket";

pub fn room_name(ticket_id: i64) -> String {
    format!("{ROOM_PREFIX}:{ticket_id}")
}

/// Move `conn` into the room of `ticket_id`, leaving the one it was in before.
///
/// The room goes away once its last member leaves, or when the ticket ends.
pub async fn create_or_rejoin(
    sockets: &SocketPool,
    conn: &Socket,
    ticket_id: i64,
) -> Result<(), PoolError> {
    leave_current(sockets, conn).await;
    sockets
        .join_or_create_room(conn.id(), &room_name(ticket_id), false)
        .await?;
    conn.set_data(CURRENT_TICKET_KEY, ticket_id);
    Ok(())
}

/// Leave the current ticket room, if any. Returns the ticket it belonged to.
pub async fn leave_current(sockets: &SocketPool, conn: &Socket) -> Option<i64> {
    let ticket_id = conn.get_data::<i64>(CURRENT_TICKET_KEY)?;
    conn.delete_data(CURRENT_TICKET_KEY);
    sockets.leave_room(conn.id(), &room_name(ticket_id)).await;
    Some(ticket_id)
}

/// Leave the current ticket room and tear it down for everyone else too.
///
/// If the room was already torn down (the ticket ended) and later recreated by
/// someone else, that new room is left alone.
pub async fn close_current(sockets: &SocketPool, conn: &Socket) -> Option<i64> {
    let ticket_id = conn.get_data::<i64>(CURRENT_TICKET_KEY)?;
    let still_member = sockets.is_member(conn.id(), &room_name(ticket_id)).await;
    leave_current(sockets, conn).await;
    if still_member {
        delete(sockets, ticket_id).await;
    }
    Some(ticket_id)
}

pub async fn delete(sockets: &SocketPool, ticket_id: i64) -> bool {
    sockets.delete_room(&room_name(ticket_id)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn rejoin_moves_between_rooms() {
        let sockets = SocketPool::new();
        let (tx, _rx) = mpsc::channel(4);
        let conn = sockets.connect(tx).await;

        create_or_rejoin(&sockets, &conn, 1).await.unwrap();
        assert!(sockets.is_member(conn.id(), "ticket:1").await);

        create_or_rejoin(&sockets, &conn, 2).await.unwrap();
        assert!(!sockets.is_member(conn.id(), "ticket:1").await);
        assert!(sockets.is_member(conn.id(), "ticket:2").await);
        assert!(!sockets.room_exists("ticket:1").await);
    }

    #[tokio::test]
    async fn leave_and_close() {
        let sockets = SocketPool::new();
        let (tx1, _rx1) = mpsc::channel(4);
        let (tx2, _rx2) = mpsc::channel(4);
        let client = sockets.connect(tx1).await;
        let agent = sockets.connect(tx2).await;

        create_or_rejoin(&sockets, &client, 7).await.unwrap();
        create_or_rejoin(&sockets, &agent, 7).await.unwrap();

        assert_eq!(leave_current(&sockets, &client).await, Some(7));
        assert_eq!(leave_current(&sockets, &client).await, None);
        assert_eq!(sockets.room_size("ticket:7").await, 1);

        assert_eq!(close_current(&sockets, &agent).await, Some(7));
        assert!(!sockets.room_exists("ticket:7").await);
    }

    #[tokio::test]
    async fn stale_close_keeps_recreated_room() {
        let sockets = SocketPool::new();
        let (tx1, _rx1) = mpsc::channel(4);
        let (tx2, _rx2) = mpsc::channel(4);
        let agent = sockets.connect(tx1).await;
        let client = sockets.connect(tx2).await;

        create_or_rejoin(&sockets, &agent, 9).await.unwrap();
        // ticket ended: room torn down while the agent still remembers it
        assert!(delete(&sockets, 9).await);

        create_or_rejoin(&sockets, &client, 9).await.unwrap();
        assert_eq!(close_current(&sockets, &agent).await, Some(9));

        assert!(sockets.room_exists("ticket:9").await);
        assert!(sockets.is_member(client.id(), "ticket:9").await);
    }
}
