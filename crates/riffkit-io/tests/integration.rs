//! Integration tests for riffkit-io

use assert_matches::assert_matches;
use bytes::Bytes;
use riffkit_io::{
    open_chunk, parse_header, write_container, Chunk, Container, Error, FourCC, Forward,
    PadState, ReadMode, ReadOptions, RiffChunk, Seekable, Stream,
};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

const SCENARIO_B: &[u8] = b"RIFF\x20\x00\x00\x00MOCK\
    CK01\x04\x00\x00\x001111\
    CK02\x08\x00\x00\x0022222222";

/// Build a small WAVE file with an odd `LIST/INFO` entry.
fn sample_wave() -> Vec<u8> {
    let mut info = Vec::new();
    Chunk::create_for_write(FourCC::new(*b"INAM").unwrap(), 5, Cursor::new(b"hello"))
        .write_to(&mut info)
        .unwrap();
    let info_len = info.len() as u32;

    let mut children = vec![
        Chunk::create_for_write(FourCC::FMT, 16, Cursor::new(vec![1u8; 16])).boxed(),
        Chunk::create_for_write(FourCC::LIST, 4 + info_len, {
            let mut list = b"INFO".to_vec();
            list.extend_from_slice(&info);
            Cursor::new(list)
        })
        .boxed(),
        Chunk::create_for_write(FourCC::DATA, 7, Cursor::new(b"samples")).boxed(),
    ];

    let mut out = Vec::new();
    write_container(&mut out, FourCC::RIFF, FourCC::WAVE, &mut children).unwrap();
    out
}

#[test]
fn test_scenario_a_single_chunk() {
    let mut src = Cursor::new(&b"RIFF\x04\x00\x00\x00MOCK"[..]);
    let header = parse_header(&mut src).unwrap();
    assert_eq!(header.tag, FourCC::RIFF);
    assert_eq!(header.size, 4);

    let mut src = Cursor::new(&b"RIFF\x04\x00\x00\x00MOCK"[..]);
    let mut chunk = Chunk::read_streamed(&mut src).unwrap();
    assert!(!chunk.is_padded());
    assert_eq!(chunk.read_remaining().unwrap(), Bytes::from_static(b"MOCK"));
    assert!(chunk.is_consumed());
}

#[test]
fn test_scenario_b_subchunks_in_both_modes() {
    for mode in [ReadMode::Buffered, ReadMode::Streamed] {
        let mut src = Forward::new(SCENARIO_B);
        let mut riff = Container::open(Chunk::read_streamed(&mut src).unwrap()).unwrap();
        assert_eq!(riff.size(), 32);

        let mut seen = Vec::new();
        while let Some(mut chunk) = riff.next_chunk(mode).unwrap() {
            seen.push((chunk.tag(), chunk.size(), chunk.read_remaining().unwrap()));
        }
        assert_eq!(
            seen,
            vec![
                ("CK01".parse::<FourCC>().unwrap(), 4, Bytes::from_static(b"1111")),
                ("CK02".parse::<FourCC>().unwrap(), 8, Bytes::from_static(b"22222222")),
            ]
        );
    }
}

#[test]
fn test_scenario_b_riff_chunk() {
    let riff = RiffChunk::from_stream(&mut Cursor::new(SCENARIO_B)).unwrap();
    assert_eq!(riff.id(), RiffChunk::ID);
    assert_eq!(riff.format(), "MOCK");
    assert_eq!(riff.subchunks().len(), 2);
    assert_eq!(riff.subchunk(1).unwrap().data(), Bytes::from_static(b"22222222"));
    assert!(riff.subchunk(2).is_none());
}

#[test]
fn test_scenario_c_truncated_header() {
    let err = parse_header(&mut Forward::new(&b"RIF"[..])).unwrap_err();
    assert_matches!(
        err,
        Error::Truncated {
            missing: 1,
            position: 3
        }
    );
    assert_eq!(
        err.to_string(),
        "Unexpected end of stream: expected 1 more byte(s) after position 3"
    );

    assert_matches!(
        parse_header(&mut Cursor::new(&b"RIFF\x04\x00"[..])),
        Err(Error::Truncated {
            missing: 2,
            position: 6
        })
    );
}

#[test]
fn test_scenario_d_truncated_payload() {
    let data = &b"RIFF\x08\x00\x00\x00MOCKDAT"[..];

    assert_matches!(
        RiffChunk::from_stream(&mut Cursor::new(data)),
        Err(Error::Truncated {
            missing: 1,
            position: 15
        })
    );

    let mut src = Forward::new(data);
    let mut riff = Container::open(Chunk::read_streamed(&mut src).unwrap()).unwrap();
    assert_eq!(riff.format(), "MOCK");
    assert_matches!(
        riff.next_chunk(ReadMode::Streamed),
        Err(Error::Truncated {
            missing: 1,
            position: 15
        })
    );
}

#[test]
fn test_written_wave_reads_back() {
    let wave = sample_wave();
    // fmt 24 + LIST (8 + 4 + 14) + data 16, plus the format tag
    assert_eq!(wave.len(), 8 + 4 + 24 + 26 + 16);

    let mut src = Cursor::new(&wave[..]);
    let mut riff = Container::open(Chunk::read_streamed(&mut src).unwrap()).unwrap();
    assert_eq!(riff.format(), FourCC::WAVE);

    let fmt = riff.next_chunk(ReadMode::Buffered).unwrap().unwrap();
    assert_eq!(fmt.tag(), FourCC::FMT);
    drop(fmt);

    let list = riff.next_chunk(ReadMode::Streamed).unwrap().unwrap();
    let mut info = Container::open(list).unwrap();
    assert_eq!(info.format(), FourCC::INFO);
    let mut name = info.next_chunk(ReadMode::Streamed).unwrap().unwrap();
    assert_eq!(name.read_remaining().unwrap(), Bytes::from_static(b"hello"));
    assert_eq!(name.pad_state(), PadState::Pending);
    assert_eq!(name.read_pad().unwrap(), Some(0));
    drop(name);
    assert!(info.next_chunk(ReadMode::Streamed).unwrap().is_none());
    drop(info);

    let mut data = riff.next_chunk(ReadMode::Streamed).unwrap().unwrap();
    assert_eq!(data.tag(), FourCC::DATA);
    assert!(data.is_padded());
    data.skip().unwrap();
    drop(data);

    assert!(riff.next_chunk(ReadMode::Streamed).unwrap().is_none());
    assert_eq!(src.position(), wave.len() as u64);
}

#[test]
fn test_projected_siblings_on_file() {
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(&sample_wave()).unwrap();
    file.seek(SeekFrom::Start(12)).unwrap();

    let stream = Stream::new(Seekable::new(file));
    let mut chunks = Vec::new();
    for _ in 0..3 {
        chunks.push(Chunk::read_projected(&stream).unwrap());
    }
    assert_eq!(stream.tell().unwrap(), 12 + 24 + 26 + 16);

    let mut data = chunks.pop().unwrap();
    assert_eq!(data.read_remaining().unwrap(), Bytes::from_static(b"samples"));
    let mut fmt = chunks.remove(0);
    assert_eq!(fmt.read_remaining().unwrap(), Bytes::from(vec![1u8; 16]));

    stream.close();
    assert_matches!(chunks[0].read(1), Err(Error::Closed));
}

#[test]
fn test_projected_requires_seekable_stream() {
    let stream = Stream::from_reader(SCENARIO_B);
    assert_matches!(Chunk::read_projected(&stream), Err(Error::NotSeekable));
}

#[test]
fn test_forward_skip_detects_truncation() {
    let mut src = Forward::new(&b"data\x10\x00\x00\x00short"[..]);
    let mut chunk = Chunk::read_streamed(&mut src).unwrap();
    assert_matches!(
        chunk.skip(),
        Err(Error::Truncated {
            missing: 11,
            position: 13
        })
    );
}

#[test]
fn test_seekable_discard_detects_truncation() {
    let mut src = Cursor::new(&b"data\x10\x00\x00\x00short"[..]);
    let mut chunk = Chunk::read_streamed(&mut src).unwrap();
    assert_matches!(chunk.discard(), Err(Error::Truncated { missing: 11, .. }));
}

#[test]
fn test_small_buffer_options() {
    let options = ReadOptions::default().buffer_size(3);
    let mut src = Forward::new(&b"data\x09\x00\x00\x00123456789\x00next\x00\x00\x00\x00"[..]);
    Chunk::read_streamed_with(&mut src, &options)
        .unwrap()
        .skip()
        .unwrap();
    assert_eq!(parse_header(&mut src).unwrap().tag, "next");
}

#[test]
fn test_open_chunk_reads_through_io_read() {
    let mut src = Forward::new(&b"abcd\x04\x00\x00\x00wxyz"[..]);
    let mut chunk = open_chunk(&mut src, ReadMode::Streamed).unwrap();
    let mut out = String::new();
    chunk.payload_mut().read_to_string(&mut out).unwrap();
    assert_eq!(out, "wxyz");
    assert!(chunk.is_consumed());
}

#[test]
fn test_io_read_surfaces_typed_truncation() {
    let mut src = Forward::new(&b"abcd\x08\x00\x00\x00wxyz"[..]);
    let mut chunk = Chunk::read_streamed(&mut src).unwrap();
    let mut buf = Vec::new();
    let err = chunk.payload_mut().read_to_end(&mut buf).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    assert_matches!(Error::from(err), Error::Truncated { missing: 4, .. });
}

#[test]
fn test_rewrite_dropping_a_chunk() {
    let wave = sample_wave();
    let mut src = Cursor::new(&wave[..]);
    let mut riff = Container::open(Chunk::read_streamed(&mut src).unwrap()).unwrap();

    let mut kept = Vec::new();
    while let Some(chunk) = riff.next_buffered().unwrap() {
        if chunk.tag() != FourCC::LIST {
            kept.push(chunk);
        }
    }

    let mut out = Vec::new();
    write_container(&mut out, FourCC::RIFF, riff.format(), &mut kept).unwrap();

    let rewritten = RiffChunk::from_stream(&mut Cursor::new(out)).unwrap();
    assert_eq!(rewritten.size(), 4 + 24 + 16);
    let tags: Vec<_> = rewritten.subchunks().iter().map(|c| c.tag()).collect();
    assert_eq!(tags, vec![FourCC::FMT, FourCC::DATA]);
}
