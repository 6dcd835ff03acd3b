use std::time::Duration;

use switchboard_fabric::{
    error::Error,
    frame::encode_multipart,
    transport::{Transport, TransportListener},
    ConnectOptions, Endpoint, PubOptions, PubSocket, RepSocket, ReqSocket, SubSocket,
};

fn loopback() -> Endpoint {
    Endpoint::tcp("127.0.0.1", 0)
}

/// Spawn a reply socket that echoes every request with a prefix
async fn echo_server(prefix: &'static [u8]) -> Endpoint {
    let mut rep = RepSocket::bind(&loopback()).await.unwrap();
    let endpoint = rep.local_endpoint().clone();

    tokio::spawn(async move {
        loop {
            let request = rep.recv().await.unwrap();
            rep.send(&[prefix, request.as_slice()].concat()).unwrap();
        }
    });

    endpoint
}

async fn wait_for_subscribers(publisher: &PubSocket, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while publisher.subscriber_count() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("subscribers did not register");
}

#[tokio::test]
async fn req_rep_roundtrip() {
    let endpoint = echo_server(b"echo:").await;

    let mut req = ReqSocket::connect(&endpoint).await.unwrap();
    for msg in [&b"first"[..], &b"second"[..], &b"third"[..]] {
        let reply = req.request(msg).await.unwrap();
        assert_eq!(reply, [&b"echo:"[..], msg].concat());
    }
}

#[tokio::test]
async fn rep_rejects_send_without_request() {
    let mut rep = RepSocket::bind(&loopback()).await.unwrap();

    assert!(matches!(rep.send(b"early"), Err(Error::Protocol(_))));
}

#[tokio::test]
async fn rep_rejects_second_receive_before_reply() {
    let mut rep = RepSocket::bind(&loopback()).await.unwrap();
    let endpoint = rep.local_endpoint().clone();

    let client = tokio::spawn(async move {
        let mut req = ReqSocket::connect(&endpoint).await.unwrap();
        req.request(b"ping").await.unwrap()
    });

    assert_eq!(rep.recv().await.unwrap(), b"ping");
    assert!(rep.awaiting_reply());
    assert!(matches!(rep.recv().await, Err(Error::Protocol(_))));

    // The violation was rejected without disturbing the pending request
    rep.send(b"pong").unwrap();
    assert!(!rep.awaiting_reply());
    assert_eq!(client.await.unwrap(), b"pong");
}

#[tokio::test]
async fn rep_receive_timeout_leaves_socket_usable() {
    let mut rep = RepSocket::bind(&loopback()).await.unwrap();
    rep.set_receive_timeout(Some(Duration::from_millis(50)));

    let started = std::time::Instant::now();
    let result = rep.recv().await;
    assert!(matches!(result, Err(Error::Timeout("Receive"))));
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert!(!rep.awaiting_reply());

    let endpoint = rep.local_endpoint().clone();
    let client = tokio::spawn(async move {
        let mut req = ReqSocket::connect(&endpoint).await.unwrap();
        req.request(b"late").await.unwrap()
    });

    rep.set_receive_timeout(Some(Duration::from_secs(5)));
    assert_eq!(rep.recv().await.unwrap(), b"late");
    rep.send(b"ok").unwrap();
    assert_eq!(client.await.unwrap(), b"ok");
}

#[tokio::test]
async fn rep_serves_many_requesters() {
    let endpoint = echo_server(b"re:").await;

    let mut clients = Vec::new();
    for i in 0..5u8 {
        let endpoint = endpoint.clone();
        clients.push(tokio::spawn(async move {
            let mut req = ReqSocket::connect(&endpoint).await.unwrap();
            let mut replies = Vec::new();
            for j in 0..3u8 {
                replies.push(req.request(&[i, j]).await.unwrap());
            }
            (i, replies)
        }));
    }

    for client in clients {
        let (i, replies) = client.await.unwrap();
        for (j, reply) in replies.into_iter().enumerate() {
            assert_eq!(reply, [&b"re:"[..], &[i, j as u8][..]].concat());
        }
    }
}

#[tokio::test]
async fn req_connect_waits_for_late_bind() {
    // Learn a free port, then release it
    let placeholder = loopback().bind().await.unwrap();
    let endpoint = placeholder.local_endpoint().unwrap();
    drop(placeholder);

    let connecting = {
        let endpoint = endpoint.clone();
        tokio::spawn(async move {
            let options = ConnectOptions::default().retry_interval(Duration::from_millis(10));
            let mut req = ReqSocket::connect_with(&endpoint, &options).await.unwrap();
            req.request(b"hello").await.unwrap()
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let mut rep = RepSocket::bind(&endpoint).await.unwrap();
    assert_eq!(rep.recv().await.unwrap(), b"hello");
    rep.send(b"world").unwrap();

    assert_eq!(connecting.await.unwrap(), b"world");
}

#[tokio::test]
async fn req_response_timeout() {
    let rep = RepSocket::bind(&loopback()).await.unwrap();

    let mut req = ReqSocket::connect(rep.local_endpoint()).await.unwrap();
    req.set_response_timeout(Some(Duration::from_millis(50)));

    let result = req.request(b"anyone?").await;
    assert!(matches!(result, Err(Error::Timeout("Response"))));
}

#[tokio::test]
async fn closing_rep_hangs_up_on_requesters() {
    let mut rep = RepSocket::bind(&loopback()).await.unwrap();
    let endpoint = rep.local_endpoint().clone();
    let mut req = ReqSocket::connect(&endpoint).await.unwrap();

    let asking = tokio::spawn(async move { req.request(b"left hanging").await });
    assert_eq!(rep.recv().await.unwrap(), b"left hanging");
    rep.close();

    let result = tokio::time::timeout(Duration::from_secs(5), asking)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_err());

    // The listener went down with the acceptor
    assert!(endpoint.connect().await.is_err());
}

#[tokio::test]
async fn subscribers_only_see_their_topic() {
    let publisher = PubSocket::bind(&loopback()).await.unwrap();
    let endpoint = publisher.local_endpoint().clone();

    let mut sub_a = SubSocket::connect(&endpoint, "A").await.unwrap();
    let mut sub_b = SubSocket::connect(&endpoint, "B").await.unwrap();
    wait_for_subscribers(&publisher, 2).await;

    assert_eq!(publisher.publish(b"B", b"for b"), 1);
    assert_eq!(publisher.publish(b"A", b"for a"), 1);

    let (topic, payload) = sub_a.recv().await.unwrap();
    assert_eq!((topic.as_slice(), payload.as_slice()), (&b"A"[..], &b"for a"[..]));

    let (topic, payload) = sub_b.recv().await.unwrap();
    assert_eq!((topic.as_slice(), payload.as_slice()), (&b"B"[..], &b"for b"[..]));
}

#[tokio::test]
async fn every_matching_subscriber_gets_identical_payload() {
    let publisher = PubSocket::bind(&loopback()).await.unwrap();
    let endpoint = publisher.local_endpoint().clone();

    let mut subs = Vec::new();
    for _ in 0..3 {
        subs.push(SubSocket::connect(&endpoint, "touch").await.unwrap());
    }
    wait_for_subscribers(&publisher, 3).await;

    assert_eq!(publisher.publish(b"touch/left", br#"{"seq":1}"#), 3);

    for sub in &mut subs {
        let (topic, payload) = sub.recv().await.unwrap();
        assert_eq!(topic, b"touch/left");
        assert_eq!(payload, br#"{"seq":1}"#);
    }
}

#[tokio::test]
async fn publish_without_subscribers_is_dropped() {
    let publisher = PubSocket::bind_with(&loopback(), PubOptions { high_water_mark: 4 })
        .await
        .unwrap();
    assert_eq!(publisher.publish(b"A", b"nobody listening"), 0);
}

#[tokio::test]
async fn subscriber_rejects_malformed_frames() {
    let listener = loopback().bind().await.unwrap();
    let endpoint = listener.local_endpoint().unwrap();

    tokio::spawn(async move {
        let mut transport = listener.accept().await.unwrap();
        let _prefix = transport.receive().await.unwrap();
        let frame = encode_multipart(&[&b"A"[..], &b"one"[..], &b"too many"[..]]);
        transport.send(&frame).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
    });

    let mut sub = SubSocket::connect(&endpoint, "A").await.unwrap();
    assert!(matches!(sub.recv().await, Err(Error::InvalidFrame(_))));
}
