use bytepipe::{ChannelError, Config, Mode, Registry};
use std::thread;
use std::time::Duration;

fn small_registry(capacity: usize) -> Registry {
    Registry::with_config(Config {
        capacity,
        max_clients: None,
    })
}

#[test]
fn write_then_read_round_trip() {
    let registry = Registry::new();
    let mut writer = registry.attach("room", Mode::NonBlocking).unwrap();
    let mut reader = registry.attach("room", Mode::NonBlocking).unwrap();

    assert_eq!(writer.write(b"Hello"), Ok(5));

    let mut buf = [0u8; 10];
    let n = reader.read(&mut buf).unwrap();
    assert_eq!(n, 5);
    assert_eq!(&buf[..n], b"Hello");
}

#[test]
fn multiple_write_read_cycles() {
    let registry = Registry::new();
    let mut writer = registry.attach("room", Mode::NonBlocking).unwrap();
    let mut reader = registry.attach("room", Mode::NonBlocking).unwrap();

    assert_eq!(writer.write(b"Hello"), Ok(5));
    assert_eq!(writer.write(b" "), Ok(1));
    assert_eq!(writer.write(b"World"), Ok(5));

    let mut buf = [0u8; 20];
    let n = reader.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"Hello World");

    assert_eq!(writer.write(b"Foo"), Ok(3));
    assert_eq!(writer.write(b"Bar"), Ok(3));

    let n = reader.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"FooBar");
}

// The capacity-8 scenario: writer W, readers A and B, all attached at
// write cursor 0. After "HELLO" and A catching up, B's 5 unread bytes
// leave room for only 2 of the 3 requested bytes.
#[test]
fn slow_reader_limits_write_room() {
    let registry = small_registry(8);
    let mut w = registry.attach("chat", Mode::NonBlocking).unwrap();
    let mut a = registry.attach("chat", Mode::NonBlocking).unwrap();
    let mut b = registry.attach("chat", Mode::NonBlocking).unwrap();

    assert_eq!(w.write(b"HELLO"), Ok(5));

    let mut buf = [0u8; 8];
    assert_eq!(a.read(&mut buf), Ok(5));
    assert_eq!(&buf[..5], b"HELLO");
    assert_eq!(a.read(&mut buf), Err(ChannelError::WouldBlock));

    // room = 8 - 1 - dist(B at 0, end at 5) = 2
    assert_eq!(w.write(b"WOW"), Ok(2));

    let n = b.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"HELLOWO");

    let n = a.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"WO");
}

#[test]
fn nonblocking_read_on_empty_channel_would_block() {
    let registry = Registry::new();
    let mut reader = registry.attach("empty", Mode::NonBlocking).unwrap();

    let mut buf = [0u8; 4];
    assert_eq!(reader.read(&mut buf), Err(ChannelError::WouldBlock));
}

#[test]
fn empty_write_accepts_zero_bytes() {
    let registry = Registry::new();
    let mut writer = registry.attach("room", Mode::NonBlocking).unwrap();
    assert_eq!(writer.write(b""), Ok(0));
}

#[test]
fn blocking_read_waits_for_writer() {
    let registry = Registry::new();
    let mut writer = registry.attach("room", Mode::NonBlocking).unwrap();
    let mut reader = registry.attach("room", Mode::Blocking).unwrap();

    let handle = thread::spawn(move || {
        let mut buf = [0u8; 16];
        let n = reader.read(&mut buf).unwrap();
        buf[..n].to_vec()
    });

    thread::sleep(Duration::from_millis(100));
    assert_eq!(writer.write(b"wakeup"), Ok(6));

    assert_eq!(handle.join().unwrap(), b"wakeup");
}

#[test]
fn blocking_write_unblocked_by_reader_progress() {
    let registry = small_registry(8);
    let mut w = registry.attach("chat", Mode::NonBlocking).unwrap();
    let mut slow = registry.attach("chat", Mode::NonBlocking).unwrap();

    // Fill the usable window, then drain the writer's own copy so only
    // the slow client constrains the room.
    assert_eq!(w.write(b"1234567"), Ok(7));
    let mut buf = [0u8; 8];
    assert_eq!(w.read(&mut buf), Ok(7));
    assert_eq!(w.write(b"XY"), Err(ChannelError::WouldBlock));

    w.set_nonblocking(false);
    let handle = thread::spawn(move || {
        let n = w.write(b"XY");
        (w, n)
    });

    thread::sleep(Duration::from_millis(100));
    assert_eq!(slow.read(&mut buf[..2]), Ok(2));

    let (_w, n) = handle.join().unwrap();
    assert_eq!(n, Ok(2));

    let n = slow.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"34567XY");
}

// Removing a stalled client must wake writers blocked on room. This is
// required behavior, not incidental.
#[test]
fn blocking_write_unblocked_by_slow_client_detach() {
    let registry = small_registry(8);
    let mut w = registry.attach("chat", Mode::NonBlocking).unwrap();
    let mut fast = registry.attach("chat", Mode::NonBlocking).unwrap();
    let mut slow = registry.attach("chat", Mode::NonBlocking).unwrap();

    assert_eq!(w.write(b"1234567"), Ok(7));
    let mut buf = [0u8; 8];
    assert_eq!(w.read(&mut buf), Ok(7));
    assert_eq!(fast.read(&mut buf), Ok(7));

    w.set_nonblocking(false);
    let handle = thread::spawn(move || {
        let n = w.write(b"XYZ");
        (w, n)
    });

    thread::sleep(Duration::from_millis(100));
    slow.detach().unwrap();

    let (_w, n) = handle.join().unwrap();
    assert_eq!(n, Ok(3));

    let n = fast.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"XYZ");
}

#[test]
fn interrupt_cancels_blocking_read_and_preserves_cursor() {
    let registry = Registry::new();
    let mut writer = registry.attach("room", Mode::NonBlocking).unwrap();
    let mut reader = registry.attach("room", Mode::Blocking).unwrap();
    let interrupter = reader.interrupter();

    let handle = thread::spawn(move || {
        let mut buf = [0u8; 8];
        let result = reader.read(&mut buf);
        (reader, result)
    });

    thread::sleep(Duration::from_millis(100));
    interrupter.interrupt();

    let (mut reader, result) = handle.join().unwrap();
    assert_eq!(result, Err(ChannelError::Interrupted));

    // The cursor did not move: the next read yields exactly what is
    // written next, from the attach position.
    assert_eq!(writer.write(b"AB"), Ok(2));
    let mut buf = [0u8; 8];
    let n = reader.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"AB");
}

#[test]
fn interrupt_cancels_blocking_write() {
    let registry = small_registry(8);
    let mut w = registry.attach("chat", Mode::NonBlocking).unwrap();
    let _slow = registry.attach("chat", Mode::NonBlocking).unwrap();

    assert_eq!(w.write(b"1234567"), Ok(7));
    let mut buf = [0u8; 8];
    assert_eq!(w.read(&mut buf), Ok(7));

    let interrupter = w.interrupter();
    w.set_nonblocking(false);
    let handle = thread::spawn(move || w.write(b"more"));

    thread::sleep(Duration::from_millis(100));
    interrupter.interrupt();

    assert_eq!(handle.join().unwrap(), Err(ChannelError::Interrupted));
}

#[test]
fn poll_reports_readiness() {
    let registry = small_registry(8);
    let mut w = registry.attach("chat", Mode::NonBlocking).unwrap();
    let mut other = registry.attach("chat", Mode::NonBlocking).unwrap();

    let ready = other.poll().unwrap();
    assert!(!ready.readable);
    assert!(ready.writable);

    assert_eq!(w.write(b"abc"), Ok(3));
    let ready = other.poll().unwrap();
    assert!(ready.readable);

    // Both clients lag by 3; after both catch up the room is full again.
    let mut buf = [0u8; 8];
    assert_eq!(other.read(&mut buf), Ok(3));
    assert_eq!(w.read(&mut buf), Ok(3));
    let ready = w.poll().unwrap();
    assert!(!ready.readable);
    assert!(ready.writable);
}

#[test]
fn poll_reports_unwritable_when_full() {
    let registry = small_registry(8);
    let mut w = registry.attach("chat", Mode::NonBlocking).unwrap();
    let _slow = registry.attach("chat", Mode::NonBlocking).unwrap();

    assert_eq!(w.write(b"1234567"), Ok(7));
    let mut buf = [0u8; 8];
    assert_eq!(w.read(&mut buf), Ok(7));

    let ready = w.poll().unwrap();
    assert!(!ready.writable);
    assert!(!ready.readable);
}

#[test]
fn operations_after_detach_return_not_found() {
    let registry = Registry::new();
    let mut client = registry.attach("room", Mode::NonBlocking).unwrap();
    client.detach().unwrap();

    let mut buf = [0u8; 4];
    assert_eq!(client.read(&mut buf), Err(ChannelError::NotFound));
    assert_eq!(client.write(b"x"), Err(ChannelError::NotFound));
    assert_eq!(client.poll(), Err(ChannelError::NotFound));
    assert!(client.is_detached());
}

#[test]
fn double_detach_is_a_noop_success() {
    let registry = Registry::new();
    let mut client = registry.attach("room", Mode::NonBlocking).unwrap();
    assert_eq!(client.detach(), Ok(()));
    assert_eq!(client.detach(), Ok(()));
}
