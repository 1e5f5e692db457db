use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tts_converter::console;
use tts_converter::{ConversionSession, EndpointConfig, NullOutput, Playback, SessionTimings};

async fn converted_session(server: &mut mockito::ServerGuard) -> (ConversionSession, Vec<u8>) {
    let _mock = server
        .mock("POST", "/convert/tts")
        .with_status(200)
        .with_body([0x52u8, 0x49, 0x46, 0x46, 0, 0])
        .create_async()
        .await;

    let timings = SessionTimings {
        progress_interval: Duration::from_millis(10),
        // Keep autoplay out of the way of the prompt under test.
        autoplay_delay: Duration::from_secs(30),
        progress_reset_delay: Duration::from_millis(50),
        request_timeout: Duration::from_secs(5),
    };
    let mut session = ConversionSession::new(
        Arc::new(NullOutput::new()),
        reqwest::Url::parse(&server.url()).unwrap(),
        timings,
    )
    .unwrap();
    session.set_input_text("hello");

    let endpoint = EndpointConfig {
        id: "default".to_string(),
        title: "Local".to_string(),
        url: "/convert/tts".to_string(),
    };
    let mut progress_out = Vec::new();
    console::convert_with_progress(&mut session, &endpoint, &mut progress_out)
        .await
        .unwrap();
    (session, progress_out)
}

#[tokio::test]
async fn test_convert_with_progress_draws_final_bar() {
    let mut server = mockito::Server::new_async().await;
    let (_session, out) = converted_session(&mut server).await;

    let text = String::from_utf8(out).unwrap();
    assert!(text.trim_end().ends_with("100%"), "unexpected output: {:?}", text);
}

#[tokio::test]
async fn test_playback_prompt_toggles_and_saves() {
    let mut server = mockito::Server::new_async().await;
    let (mut session, _) = converted_session(&mut server).await;
    assert_eq!(session.playback(), Some(Playback::Paused));

    // Commands arrive one read at a time, like a terminal delivers them.
    let stdin = tokio_test::io::Builder::new()
        .read(b"p\n")
        .read(b"s\n")
        .read(b"bogus\n")
        .read(b"q\n")
        .build();

    let dir = tempdir().unwrap();
    let mut out = Vec::new();
    console::playback_prompt(&mut session, tokio::io::BufReader::new(stdin), &mut out, dir.path())
        .await
        .unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("playing"), "unexpected output: {}", text);
    assert!(text.contains("Saved"));
    assert!(text.contains("Unknown command: bogus"));

    let saved = std::fs::read(dir.path().join("tts-output.wav")).unwrap();
    assert_eq!(saved, vec![0x52u8, 0x49, 0x46, 0x46, 0, 0]);
}

#[tokio::test]
async fn test_playback_prompt_ends_on_eof() {
    let mut server = mockito::Server::new_async().await;
    let (mut session, _) = converted_session(&mut server).await;

    let dir = tempdir().unwrap();
    let mut out = Vec::new();
    console::playback_prompt(&mut session, &b""[..], &mut out, dir.path())
        .await
        .unwrap();

    assert!(String::from_utf8(out).unwrap().starts_with("[p] play/pause"));
    assert!(!dir.path().join("tts-output.wav").exists());
}
