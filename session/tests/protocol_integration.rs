//! Exercises a typed `cdp_protocol` command and event through the untyped `Session` core,
//! end to end, against the in-process mock transport.

use cdp_session::{cmd, types::Method, types::MethodType, Session, SessionState};
use cdp_protocol::page;

mod support {
    use cdp_session::transport::mock;
    use cdp_session::transport::{TransportReader, TransportWriter};
    use cdp_session::Session;

    pub fn session_pair() -> (Session, mock::MockReader, mock::MockWriter) {
        let (our_reader, our_writer, their_reader, their_writer) = mock::channel();
        let session = Session::launch_with_transport(TransportReader::Mock(our_reader), TransportWriter::Mock(our_writer));
        (session, their_reader, their_writer)
    }

    pub async fn recv_call(reader: &mut mock::MockReader) -> cdp_session::types::MethodCall {
        let bytes = reader.read_frame().await.unwrap().unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}

use support::{recv_call, session_pair};

#[tokio::test]
async fn typed_command_round_trips_through_send_and_cmd_helpers() {
    let (session, mut their_reader, mut their_writer) = session_pair();

    let params = page::NavigateParams::new("https://example.com");
    let (method, value) = cmd::encode_command(&params).unwrap();
    assert_eq!(method, params.identifier());

    let send = tokio::spawn({
        let session = session.clone();
        let method = method.clone();
        async move { session.send(method, value).await }
    });

    let call = recv_call(&mut their_reader).await;
    assert_eq!(call.method, "Page.navigate");
    assert_eq!(call.params["url"], "https://example.com");

    their_writer
        .write_frame(format!(r#"{{"id":{},"result":{{"frameId":"f1"}}}}"#, call.id.value()).as_bytes())
        .await
        .unwrap();

    let response = send.await.unwrap().unwrap();
    let typed = cmd::to_command_response::<page::NavigateParams>(response, method).unwrap();
    assert_eq!(typed.result.frame_id, "f1");
    assert_eq!(typed.result.error_text, None);
}

#[tokio::test]
async fn subscribed_typed_event_arrives_as_untyped_params_decodable_into_the_typed_shape() {
    let (session, _their_reader, mut their_writer) = session_pair();

    let mut sub = session.subscribe(page::EventLoadEventFired::method_id()).await;

    their_writer
        .write_frame(br#"{"method":"Page.loadEventFired","params":{"timestamp":1234.5}}"#)
        .await
        .unwrap();

    let event = sub.events.recv().await.unwrap();
    let typed: page::EventLoadEventFired = serde_json::from_value(event.params).unwrap();
    assert_eq!(typed.timestamp, 1234.5);

    assert_eq!(session.state(), SessionState::Running);
    session.cancel();
    session.wait().await;
    assert_eq!(session.state(), SessionState::Terminated);
}
