// End-to-end tests of a library session against real folders on disk

use retrohub::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"data").unwrap();
}

fn write_cover(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    image::RgbaImage::from_pixel(16, 24, image::Rgba([10, 20, 30, 255]))
        .save(path)
        .unwrap();
}

/// Pump until `done` holds, collecting every update
fn pump_until(
    session: &mut LibrarySession,
    mut done: impl FnMut(&LibrarySession, &[SessionUpdate]) -> bool,
) -> Vec<SessionUpdate> {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut updates = Vec::new();
    loop {
        updates.push(session.pump());
        if done(session, &updates) {
            return updates;
        }
        assert!(Instant::now() < deadline, "timed out waiting for the session");
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn library(base: &Path) {
    let dendy = base.join("Dendy");
    touch(&dendy.join("Contra/Rom/contra.nes"));
    write_cover(&dendy.join("Contra/images/cartridge.png"));
    fs::write(
        dendy.join("Contra/index.html"),
        "<p><b>Developer:</b> Konami</p><p><b>Release Date:</b> 1988</p>",
    )
    .unwrap();

    touch(&dendy.join("Super Mario Bros/smb.nes"));
    touch(&dendy.join("Dr. Mario/Rom/drmario.nes"));
    fs::create_dir_all(dendy.join("Not A Game/images")).unwrap();

    touch(&base.join("Sega/Sonic/Rom/sonic.gen"));
}

fn config(base: &Path) -> Config {
    let mut config = Config::default();
    config.base_dir = base.to_path_buf();
    config
}

#[test]
fn test_browse_search_and_switch() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path());
    let mut session = LibrarySession::new(config(dir.path()));

    session.switch_console("DENDY").unwrap();
    assert_eq!(session.status(), LibraryStatus::Scanning);
    assert_eq!(session.layout(780.0).placeholder, Some(Placeholder::Loading));

    let updates = pump_until(&mut session, |s, _| s.status() == LibraryStatus::Ready);
    assert!(updates[0].reset);
    assert!(updates.iter().any(|u| u.relayout));

    let titles: Vec<&str> = session.entries().iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Contra", "Dr. Mario", "Super Mario Bros"]);
    let contra = &session.entries()[0];
    assert!(contra.summary.starts_with("Developer: Konami\nYear: 1988"));

    let placement = session.layout(780.0).clone();
    assert_eq!(placement.columns, 4);
    assert_eq!(placement.cells.len(), 3);
    assert_eq!(placement.filler_row, 1);

    let narrow = session.layout(200.0).clone();
    assert_eq!(narrow.columns, 1);
    assert_eq!(
        narrow.cells.iter().map(|c| c.row).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );

    // Covers arrive asynchronously; the one without art ends up Missing.
    pump_until(&mut session, |s, _| {
        s.entries()
            .iter()
            .all(|e| !matches!(s.item(&e.folder_name).map(|i| &i.cover), Some(CoverState::Loading)))
    });
    match &session.item(&FolderKey::from("Contra")).unwrap().cover {
        CoverState::Ready(cover) => assert_eq!((cover.width, cover.height), (16, 24)),
        other => panic!("expected a decoded cover, got {:?}", other),
    }
    assert!(matches!(
        session.item(&FolderKey::from("Dr. Mario")).unwrap().cover,
        CoverState::Missing
    ));

    session.set_search("mario");
    let placement = session.layout(780.0).clone();
    let keys: Vec<&str> = placement.cells.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(keys, vec!["Dr. Mario", "Super Mario Bros"]);
    assert_eq!(session.items().visible_count(), 2);

    session.switch_console("SEGA").unwrap();
    assert!(session.items().is_empty());
    assert!(session.entries().is_empty());
    assert_eq!(session.query(), "");

    pump_until(&mut session, |s, _| s.status() == LibraryStatus::Ready);
    let titles: Vec<&str> = session.entries().iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Sonic"]);
    assert!(session.item(&FolderKey::from("Contra")).is_none());
}

#[test]
fn test_same_console_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path());
    let mut session = LibrarySession::new(config(dir.path()));

    session.switch_console("DENDY").unwrap();
    pump_until(&mut session, |s, _| s.status() == LibraryStatus::Ready);
    session.switch_console("DENDY").unwrap();

    assert_eq!(session.status(), LibraryStatus::Ready);
    assert_eq!(session.items().len(), 3);
}

#[test]
fn test_missing_root_shows_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = LibrarySession::new(config(dir.path()));

    session.switch_console("SONY").unwrap();
    pump_until(&mut session, |s, _| s.status() != LibraryStatus::Scanning);

    assert_eq!(
        session.status(),
        LibraryStatus::RootMissing(dir.path().join("Sony"))
    );
    let placement = session.layout(780.0);
    assert!(placement.cells.is_empty());
    assert!(matches!(placement.placeholder, Some(Placeholder::NotFound(_))));
}

#[test]
fn test_switch_during_scan_drops_old_library() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..150 {
        let game = dir.path().join(format!("Dendy/Game {:03}", i));
        touch(&game.join("Rom/game.nes"));
        write_cover(&game.join("images/cartridge.png"));
    }
    touch(&dir.path().join("Sega/Sonic/Rom/sonic.gen"));

    let mut session = LibrarySession::new(config(dir.path()));
    session.switch_console("DENDY").unwrap();
    session.pump();
    session.switch_console("SEGA").unwrap();

    let updates = pump_until(&mut session, |s, _| {
        s.status() == LibraryStatus::Ready && !s.is_busy()
    });

    let titles: Vec<&str> = session.entries().iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Sonic"]);
    assert_eq!(session.items().len(), 1);
    assert!(session.item(&FolderKey::from("Sonic")).is_some());
    for update in &updates {
        assert!(update.covers.iter().all(|key| key.as_str() == "Sonic"));
    }
    assert_eq!(session.layout(780.0).cells.len(), 1);
}

#[cfg(unix)]
#[test]
fn test_launch_reports_emulator_exit() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path());

    let mut config = config(dir.path());
    let dendy = config.consoles.get_mut("DENDY").unwrap();
    dendy.emulator = PathBuf::from("/bin/sh");
    dendy.fullscreen_arg = "-c 'exit 0'".to_string();

    let mut session = LibrarySession::new(config);
    session.switch_console("DENDY").unwrap();
    pump_until(&mut session, |s, _| s.status() == LibraryStatus::Ready);

    assert!(session.launch(&FolderKey::from("Contra")).unwrap());
    let updates = pump_until(&mut session, |_, updates| {
        updates.iter().any(|u| u.emulator_closed.is_some())
    });
    let closed = updates
        .into_iter()
        .find_map(|u| u.emulator_closed)
        .unwrap();
    assert_eq!(
        closed.rom,
        dir.path().join("Dendy/Contra/Rom/contra.nes")
    );
    assert_eq!(closed.outcome, retrohub::emulator::ExitOutcome::Exited(Some(0)));
}
