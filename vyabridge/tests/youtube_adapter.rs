mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use serde_json::json;

use common::{FakeIframePlayer, RecordingMediaSession, RecordingServerLink, settle};
use vyabridge::surface::memory::MemoryAffordance;
use vyabridge::{
    AdapterState, BackendEvent, Bridges, Heartbeat, IframePlayer, IframePlayerState, Originator,
    PlayCmd, PlayOutcome, PlayPause, PlaybackAdapter, PlaybackDescriptor, PlaybackMetadata,
    PlayerHook, YouTubeAdapter,
};

fn descriptor(locator: &str, elapsed: f64) -> PlaybackDescriptor {
    PlaybackDescriptor {
        meta: PlaybackMetadata {
            file_path: Some(locator.to_string()),
            ..Default::default()
        },
        playing: None,
        elapsed,
    }
}

fn adapter(duration_s: f64) -> (Arc<FakeIframePlayer>, Arc<MemoryAffordance>, Arc<YouTubeAdapter<FakeIframePlayer>>) {
    let player = FakeIframePlayer::new(duration_s);
    let ui = MemoryAffordance::new();
    let adapter = Arc::new(YouTubeAdapter::new(Arc::clone(&player), ui.clone()));
    (player, ui, adapter)
}

#[tokio::test(start_paused = true)]
async fn test_play_media_cues_and_plays() {
    let (player, _, adapter) = adapter(300.0);

    let outcome = adapter
        .play_media(&descriptor("https://www.youtube.com/watch?v=abcDEF12_-x", 12_000.0))
        .await
        .unwrap();
    assert_eq!(outcome, PlayOutcome::Started);
    assert_eq!(player.video_id().as_deref(), Some("abcDEF12_-x"));
    assert_eq!(player.get_current_time(), 12.0);
    assert_eq!(player.get_player_state(), IframePlayerState::Playing);

    // short link to the same video is not cued again
    let again = adapter
        .play_media(&descriptor("https://youtu.be/abcDEF12_-x", 12_000.0))
        .await
        .unwrap();
    assert_eq!(again, PlayOutcome::AlreadyPlaying);
    assert_eq!(player.cues.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unrecognized_locator_fails() {
    let (_, _, adapter) = adapter(300.0);
    assert!(matches!(
        adapter.load_source(&descriptor("https://example.com/a.mp3", 0.0)),
        Err(vyabridge::Error::Playback { backend: "youtube", .. })
    ));
    assert_eq!(adapter.state(), AdapterState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_seek_stop_and_status() {
    let (player, _, adapter) = adapter(300.0);
    assert!(adapter.report_status().is_none());

    adapter.play_media(&descriptor("abcDEF12_-x", 0.0)).await.unwrap();
    adapter.seek(90_250.0).await.unwrap();
    assert_eq!(player.seeks.lock().last().copied(), Some(90.25));

    let status = adapter.report_status().unwrap();
    assert!(status.is_playing);
    assert_eq!(status.current_time_ms, 90_250.0);
    assert_eq!(status.duration_ms, 300_000.0);

    adapter.stop().unwrap();
    assert!(adapter.is_paused());
    assert_eq!(player.get_current_time(), 0.0);
    assert_eq!(adapter.state(), AdapterState::Paused);
}

#[tokio::test(start_paused = true)]
async fn test_blocked_autoplay() {
    let (player, ui, adapter) = adapter(300.0);
    player.refuse_play.store(true, Ordering::SeqCst);

    let outcome = adapter.play_media(&descriptor("abcDEF12_-x", 0.0)).await.unwrap();
    assert_eq!(outcome, PlayOutcome::Blocked);
    assert_eq!(ui.reveal_count(), 1);
    assert!(adapter.is_blocked());
    assert!(adapter.is_paused());
}

#[tokio::test(start_paused = true)]
async fn test_report_video_status() {
    let (_, _, adapter) = adapter(300.0);
    adapter.play_media(&descriptor("abcDEF12_-x", 1500.0)).await.unwrap();

    let server = RecordingServerLink::new();
    adapter.report_video_status(server.as_ref()).unwrap();

    let pushed = server.events_named("reportVideoStatus");
    assert_eq!(pushed.len(), 1);
    assert_eq!(
        pushed[0].payload,
        json!({
            "duration": 300_000.0,
            "videoUrl": "https://www.youtube.com/watch?v=abcDEF12_-x",
            "currentTime": 1500.0
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_hook_over_youtube_answers_heartbeat() {
    let (player, _, adapter) = adapter(300.0);
    let bridges = Bridges::new();
    let server = RecordingServerLink::new();
    let session = RecordingMediaSession::new();
    let hook = PlayerHook::mount(adapter, bridges.clone(), server, session.clone());

    bridges.play_pause.publish(&PlayPause {
        cmd: PlayCmd::Play,
        playback: descriptor("youtu.be/abcDEF12_-x", 2000.0),
        originator: Originator::MediaBridge,
    });
    settle().await;
    assert_eq!(player.video_id().as_deref(), Some("abcDEF12_-x"));

    let replies = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&replies);
    let _sub = bridges.heartbeat.subscribe(move |msg: &Heartbeat| {
        if let Some(info) = msg.current_playback_info {
            sink.lock().push((msg.originator, info.current_time_ms));
        }
    });
    bridges.heartbeat.publish(&Heartbeat::request(Originator::MediaBridge));
    assert_eq!(*replies.lock(), vec![(Originator::AudioPlayer, 2000.0)]);

    if let Some(event) = IframePlayerState::Cued.backend_event() {
        hook.handle_backend_event(event);
    }
    hook.handle_backend_event(BackendEvent::Ready);
    assert!(session.has_handler(vyabridge::MediaAction::Play));
}
