//! Client sessions against a scripted in-process relay.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use relaymail_smtp::connection::connect;
use relaymail_smtp::{Address, Client, Error, SmtpConnection};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Starts a relay that advertises `ehlo_lines` and accepts everything.
///
/// The handle resolves to the full transcript received from the client.
async fn spawn_relay(ehlo_lines: &'static [&'static str]) -> (u16, JoinHandle<String>) {
    spawn_scripted_relay(Some(ehlo_lines)).await
}

/// Like [`spawn_relay`]; `None` makes the relay refuse EHLO and accept HELO.
async fn spawn_scripted_relay(
    ehlo_lines: Option<&'static [&'static str]>,
) -> (u16, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut reader = BufReader::new(read);
        let mut transcript = String::new();
        let mut in_data = false;

        write.write_all(b"220 fake.relay ESMTP\r\n").await.unwrap();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await.unwrap() == 0 {
                break;
            }
            transcript.push_str(&line);

            if in_data {
                if line == ".\r\n" {
                    in_data = false;
                    write.write_all(b"250 2.0.0 Ok: queued\r\n").await.unwrap();
                }
                continue;
            }

            let upper = line.to_ascii_uppercase();
            if upper.starts_with("EHLO") {
                let Some(ehlo_lines) = ehlo_lines else {
                    write.write_all(b"502 5.5.2 Command not recognized\r\n").await.unwrap();
                    continue;
                };
                let mut reply = String::from("250-fake.relay\r\n");
                for (i, ext) in ehlo_lines.iter().enumerate() {
                    let sep = if i + 1 == ehlo_lines.len() { ' ' } else { '-' };
                    reply.push_str(&format!("250{sep}{ext}\r\n"));
                }
                if ehlo_lines.is_empty() {
                    reply = "250 fake.relay\r\n".to_string();
                }
                write.write_all(reply.as_bytes()).await.unwrap();
            } else if upper.starts_with("DATA") {
                in_data = true;
                write.write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n").await.unwrap();
            } else if upper.starts_with("QUIT") {
                write.write_all(b"221 Bye\r\n").await.unwrap();
                break;
            } else {
                write.write_all(b"250 Ok\r\n").await.unwrap();
            }
        }
        transcript
    });

    (port, handle)
}

#[tokio::test]
async fn full_transaction_with_extensions() {
    let (port, relay) = spawn_relay(&["SIZE 10240", "8BITMIME"]).await;

    let stream = connect("127.0.0.1", port).await.unwrap();
    let client = Client::from_stream(stream).await.unwrap();
    assert_eq!(client.server_info().hostname, "fake.relay");
    let client = client.ehlo("localhost").await.unwrap();
    assert_eq!(client.server_info().max_message_size(), Some(10240));

    let message = b"Subject: Hi\r\n\r\n.hidden\r\nbye\r\n";
    let client = client
        .mail_from(Address::new("a@x.com").unwrap(), Some(message.len()))
        .await
        .unwrap()
        .rcpt_to(Address::new("b@y.com").unwrap())
        .await
        .unwrap()
        .data()
        .await
        .unwrap()
        .send_message(message)
        .await
        .unwrap();
    client.quit().await.unwrap();

    let transcript = relay.await.unwrap();
    assert!(transcript.starts_with("EHLO localhost\r\n"));
    assert!(transcript.contains(&format!(
        "MAIL FROM:<a@x.com> BODY=8BITMIME SIZE={}\r\n",
        message.len()
    )));
    assert!(transcript.contains("RCPT TO:<b@y.com>\r\n"));
    assert!(transcript.contains("DATA\r\nSubject: Hi\r\n\r\n..hidden\r\nbye\r\n.\r\nQUIT\r\n"));
}

#[tokio::test]
async fn plain_relay_gets_bare_mail_from() {
    let (port, relay) = spawn_relay(&[]).await;

    let stream = connect("127.0.0.1", port).await.unwrap();
    let client = Client::from_stream(stream)
        .await
        .unwrap()
        .ehlo("localhost")
        .await
        .unwrap()
        .mail_from(Address::new("a@x.com").unwrap(), Some(10))
        .await
        .unwrap();
    client.quit().await.unwrap();

    let transcript = relay.await.unwrap();
    assert!(transcript.contains("MAIL FROM:<a@x.com>\r\n"));
}

#[tokio::test]
async fn refused_ehlo_falls_back_to_helo() {
    let (port, relay) = spawn_scripted_relay(None).await;

    let stream = connect("127.0.0.1", port).await.unwrap();
    let client = Client::from_stream(stream)
        .await
        .unwrap()
        .ehlo("localhost")
        .await
        .unwrap();
    assert!(client.server_info().extensions.is_empty());
    let client = client
        .mail_from(Address::new("a@x.com").unwrap(), Some(10))
        .await
        .unwrap();
    client.quit().await.unwrap();

    let transcript = relay.await.unwrap();
    assert!(transcript.starts_with("EHLO localhost\r\nHELO localhost\r\n"));
    assert!(transcript.contains("MAIL FROM:<a@x.com>\r\n"));
}

#[tokio::test]
async fn oversized_message_rejected_before_mail_from() {
    let (port, relay) = spawn_relay(&["SIZE 16"]).await;

    let stream = connect("127.0.0.1", port).await.unwrap();
    let client = Client::from_stream(stream)
        .await
        .unwrap()
        .ehlo("localhost")
        .await
        .unwrap();
    let err = client
        .mail_from(Address::new("a@x.com").unwrap(), Some(17))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MessageTooLarge { size: 17, limit: 16 }));

    let transcript = relay.await.unwrap();
    assert!(!transcript.contains("MAIL FROM"));
}

#[tokio::test]
async fn rejected_recipient_surfaces_reply() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket
            .write_all(b"220 r\r\n")
            .await
            .unwrap();
        let mut reader = BufReader::new(&mut socket);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        reader.get_mut().write_all(b"250 r\r\n").await.unwrap();
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        reader.get_mut().write_all(b"250 Ok\r\n").await.unwrap();
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        reader
            .get_mut()
            .write_all(b"550 5.1.1 No such user\r\n")
            .await
            .unwrap();
    });

    let stream = connect("127.0.0.1", port).await.unwrap();
    let err = Client::from_stream(stream)
        .await
        .unwrap()
        .ehlo("localhost")
        .await
        .unwrap()
        .mail_from(Address::new("a@x.com").unwrap(), None)
        .await
        .unwrap()
        .rcpt_to(Address::new("nobody@y.com").unwrap())
        .await
        .unwrap_err();
    assert!(err.is_permanent());
    assert!(err.to_string().contains("No such user"));
}

#[tokio::test]
async fn relay_hanging_up_is_connection_closed() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(b"220-still greeting\r\n").await.unwrap();
    });

    let stream = connect("127.0.0.1", port).await.unwrap();
    let err = Client::from_stream(stream).await.unwrap_err();
    assert!(matches!(err, Error::ConnectionClosed));
}

#[tokio::test]
async fn refused_greeting_is_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(b"554 go away\r\n").await.unwrap();
    });

    let stream = connect("127.0.0.1", port).await.unwrap();
    let err = Client::from_stream(stream).await.unwrap_err();
    assert!(matches!(err, Error::SmtpError { code: 554, .. }));
}
