//! Open one experience on a few simulated devices
//!
//! Run with `RUST_LOG=debug` to see the probe and router decisions.

use ar_experience::{
    ExperienceSession, MockEnvironment, MockViewerFactory, SessionConfig, TokioRuntime,
    UserAction, ViewerError, ViewerEvent,
};

const PAYLOAD: &str = r#"{
    "id": "exp-demo",
    "name": "Sculpture garden",
    "assets": [
        {"name": "Intro", "kind": "message", "text": "Walk around the statue"},
        {"name": "Statue", "kind": "model3d", "url": "/models/statue.glb"},
        {"name": "Plaque", "kind": "image", "url": "./img/plaque.jpg"},
        {"name": "Broken", "kind": "video"}
    ]
}"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("ar_experience v{}", ar_experience::VERSION);

    let devices = [
        ("desktop", MockEnvironment::desktop()),
        ("phone", MockEnvironment::phone()),
        ("tablet", MockEnvironment::tablet()),
        ("ar phone", MockEnvironment::ar_phone()),
    ];

    for (label, env) in devices {
        let factory = MockViewerFactory::new();
        let journal = factory.journal();
        let mut session = ExperienceSession::open_json(
            PAYLOAD,
            env,
            TokioRuntime::new(),
            factory,
            SessionConfig::default(),
        )?;

        session.mount().await;
        println!(
            "{label:>9}: {:?} ({} assets, {} dropped)",
            session.active_mode(),
            session.router().assets().len(),
            session.dropped_assets()
        );

        if label == "ar phone" {
            session.viewer_event(ViewerEvent::Error(ViewerError::PermissionDenied(
                "camera access refused".into(),
            )));
            println!(
                "{label:>9}: after denial {:?}, notice {:?}",
                session.active_mode(),
                session.router().notice()
            );
        }

        session.handle(UserAction::GoBack).await;
        println!(
            "{label:>9}: {} mounts, {} unmounts",
            journal.mounts(),
            journal.unmounts()
        );
    }

    Ok(())
}
