//! Loopback tests for the UDP streams.
//!
//! Every test binds its own ephemeral port on 127.0.0.1.

use std::io::Write;
use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::Duration;

use vban_stream::codec::{AudioFormat, HeaderFactory, SampleRate};
use vban_stream::network::{VbanInputStream, VbanOutputStream, VbanReceiver};
use vban_stream::{CodecError, Error, NetworkError, PacketFactory, Payload, ProtocolTag};

fn input_stream(expected: ProtocolTag) -> (VbanInputStream, SocketAddr) {
    let mut stream = VbanInputStream::open(expected, "127.0.0.1:0".parse().unwrap()).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5)));
    let addr = stream.local_addr().unwrap();
    (stream, addr)
}

/// Text commands arrive intact and in counter order.
#[test]
fn test_text_round_trip() {
    let (mut input, addr) = input_stream(ProtocolTag::Text);
    let mut output = VbanOutputStream::open_text(addr).unwrap();

    output.send_text("Strip[0].Mute=1").unwrap();
    output.send_text("Bus[1].Gain=-3.5").unwrap();

    let first = input.read_packet().unwrap();
    assert_eq!(first.header.protocol, ProtocolTag::Text);
    assert_eq!(first.header.stream_name, "Command1");
    assert_eq!(first.header.frame_counter, 0);
    assert_eq!(&first.payload[..], b"Strip[0].Mute=1");

    let second = input.read_data().unwrap();
    assert_eq!(second.as_text(), Some("Bus[1].Gain=-3.5"));

    let stats = output.stats();
    assert_eq!(stats.packets_sent, 2);
    assert_eq!(stats.bytes_sent, (28 + 15 + 28 + 16) as u64);
}

/// Each newline written through `io::Write` ends one packet.
#[test]
fn test_newline_flush() {
    let (mut input, addr) = input_stream(ProtocolTag::Text);
    let mut output = VbanOutputStream::open_text(addr).unwrap();

    write!(output, "first\nsecond\nrest").unwrap();

    assert_eq!(input.read_data().unwrap().as_text(), Some("first\n"));
    assert_eq!(input.read_data().unwrap().as_text(), Some("second\n"));

    output.close().unwrap();
    let rest = input.read_packet().unwrap();
    assert_eq!(&rest.payload[..], b"rest");
    assert_eq!(rest.header.frame_counter, 2);
}

/// A packet of the wrong protocol is a hard error.
#[test]
fn test_protocol_mismatch() {
    let (mut input, addr) = input_stream(ProtocolTag::Audio);
    let mut output = VbanOutputStream::open_text(addr).unwrap();

    output.send_text("Command1.Restart=1").unwrap();

    match input.read_data() {
        Err(Error::Network(NetworkError::ProtocolMismatch { expected, received })) => {
            assert_eq!(expected, ProtocolTag::Audio);
            assert_eq!(received, ProtocolTag::Text);
        }
        other => panic!("expected protocol mismatch, got {:?}", other),
    }
}

/// Audio payloads come back as frames of the stream's format.
#[test]
fn test_audio_round_trip() {
    let (mut input, addr) = input_stream(ProtocolTag::Audio);
    let head = HeaderFactory::default_for(ProtocolTag::Audio)
        .unwrap()
        .rate(SampleRate::Hz44100)
        .samples(64)
        .build()
        .unwrap();
    let mut output = VbanOutputStream::open(addr, PacketFactory::new(head)).unwrap();

    // 64 stereo frames of 16-bit PCM
    output.send_data(vec![0u8; 256]).unwrap();

    let packet = input.read_packet().unwrap();
    assert_eq!(packet.header.samples, 64);
    assert_eq!(packet.header.channel, 2);

    match packet.into_payload().unwrap() {
        Payload::Audio(frame) => {
            assert_eq!(frame.frame_count(AudioFormat::Int16, 2), Some(64));
        }
        other => panic!("expected audio payload, got {:?}", other),
    }
}

/// Garbage datagrams fail decoding instead of being misread.
#[test]
fn test_bad_magic_datagram() {
    let (mut input, addr) = input_stream(ProtocolTag::Text);
    let raw = UdpSocket::bind("127.0.0.1:0").unwrap();

    raw.send_to(&[b'X'; 40], addr).unwrap();

    assert!(matches!(
        input.read_packet(),
        Err(Error::Codec(CodecError::BadMagic(_)))
    ));
}

/// Closing from another thread unblocks a pending read.
#[test]
fn test_close_unblocks_read() {
    let (mut input, _addr) = input_stream(ProtocolTag::Text);
    input.set_read_timeout(None);
    let handle = input.close_handle();

    let reader = thread::spawn(move || input.read_packet());

    thread::sleep(Duration::from_millis(50));
    handle.close();

    let result = reader.join().unwrap();
    assert!(matches!(
        result,
        Err(Error::Network(NetworkError::SocketClosed))
    ));
}

/// Oversized writes fail before anything reaches the wire.
#[test]
fn test_oversized_write_sends_nothing() {
    let (mut input, addr) = input_stream(ProtocolTag::Text);
    input.set_read_timeout(Some(Duration::from_millis(200)));
    let mut output = VbanOutputStream::open_text(addr).unwrap();

    let result = output.send_data(vec![b'x'; 1409]);
    assert!(matches!(
        result,
        Err(Error::Codec(CodecError::PayloadTooLarge(1409)))
    ));

    assert!(matches!(
        input.read_packet(),
        Err(Error::Network(NetworkError::Timeout(_)))
    ));
}

/// The background receiver forwards valid packets and counts invalid ones.
#[test]
fn test_background_receiver() {
    let (tx, rx) = crossbeam_channel::bounded(64);
    let mut receiver = VbanReceiver::new();
    receiver.set_channel(tx);
    receiver
        .start_on("127.0.0.1:0".parse().unwrap(), &Default::default())
        .unwrap();
    let addr = receiver.local_addr().unwrap();

    let raw = UdpSocket::bind("127.0.0.1:0").unwrap();
    raw.send_to(b"not a vban packet", addr).unwrap();

    let mut output = VbanOutputStream::open_text(addr).unwrap();
    for command in ["Strip[0].A1=1", "Strip[0].A2=0", "Strip[0].B1=1"] {
        output.send_text(command).unwrap();
    }

    let received: Vec<_> = (0..3)
        .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
        .collect();

    let counters: Vec<u32> = received.iter().map(|p| p.header.frame_counter).collect();
    assert_eq!(counters, vec![0, 1, 2]);
    assert_eq!(
        received[2].to_payload().unwrap().as_text(),
        Some("Strip[0].B1=1")
    );
    assert_eq!(received[0].source.port(), output.local_addr().unwrap().port());

    let stats = receiver.stats();
    assert_eq!(stats.packets_received, 4);
    assert_eq!(stats.invalid_packets, 1);

    receiver.stop();
    assert!(!receiver.is_running());
}
