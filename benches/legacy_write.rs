//! Legacy session benchmarks
//!
//! Measures the overhead the legacy layer adds on top of the engine:
//! - Return-code translation
//! - Full writes assembled from engine chunks of various sizes
//! - Partial-write mode
//! - In-memory OpenSSL round trips
//!
//! Run with: cargo bench --bench legacy_write

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tls_legacy::legacy::{
    memory_pair, return_code, AlertDescription, ContentType, Context, HandshakeDriver, IoOutcome,
    RecordLayer, Session, SessionConfig,
};
use tls_legacy::tls::{self, TlsConfig};

/// Engine that accepts at most `chunk` bytes per write and discards them
struct Sink {
    chunk: usize,
}

impl RecordLayer for Sink {
    fn read_application_data(&mut self, _buf: &mut [u8]) -> IoOutcome {
        IoOutcome::WantPollIn
    }

    fn peek_application_data(&mut self, _buf: &mut [u8]) -> IoOutcome {
        IoOutcome::WantPollIn
    }

    fn write_application_data(&mut self, buf: &[u8]) -> IoOutcome {
        IoOutcome::Success(buf.len().min(self.chunk))
    }

    fn send_pending_output(&mut self) -> IoOutcome {
        IoOutcome::Success(0)
    }

    fn send_alert(&mut self, _alert: AlertDescription) -> IoOutcome {
        IoOutcome::Success(0)
    }

    fn pending_application_data(&self) -> isize {
        0
    }

    fn close_notify_received(&mut self) -> bool {
        false
    }
}

impl HandshakeDriver for Sink {
    fn drive_handshake(&mut self) -> i32 {
        1
    }
}

fn sink_session(chunk: usize, config: SessionConfig) -> Session<Sink> {
    let mut session = Session::new(Sink { chunk }, Context::new(), config);
    session.do_handshake();
    session
}

fn bench_return_code(c: &mut Criterion) {
    let mut group = c.benchmark_group("return_code");
    let ctx = Context::new();

    group.bench_function("success", |b| {
        b.iter(|| return_code(&ctx, black_box(IoOutcome::Success(1024))))
    });

    group.bench_function("want_poll_in", |b| {
        b.iter(|| return_code(&ctx, black_box(IoOutcome::WantPollIn)))
    });

    group.finish();
}

fn bench_full_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_write");
    let data = vec![0x5au8; 64 * 1024];
    group.throughput(Throughput::Bytes(data.len() as u64));

    for chunk in [512usize, 4096, 16384] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            let mut session = sink_session(chunk, SessionConfig::new());
            b.iter(|| {
                session.write_bytes(
                    ContentType::ApplicationData,
                    black_box(&data),
                    data.len() as i32,
                )
            });
        });
    }

    group.finish();
}

fn bench_partial_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("partial_write");
    let data = vec![0x5au8; 16 * 1024];
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("single_record", |b| {
        let mut session = sink_session(16384, SessionConfig::new().partial_write(true));
        b.iter(|| {
            session.write_bytes(
                ContentType::ApplicationData,
                black_box(&data),
                data.len() as i32,
            )
        });
    });

    group.finish();
}

fn bench_openssl_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("openssl_round_trip");
    let client_tls = TlsConfig::client().unwrap().build().unwrap();
    let server_tls = TlsConfig::server().unwrap().build().unwrap();

    let (client_io, server_io) = memory_pair();
    let mut client = tls::client_session(&client_tls, SessionConfig::new(), client_io).unwrap();
    let mut server = tls::server_session(&server_tls, SessionConfig::new(), server_io).unwrap();
    for _ in 0..10 {
        let client_ret = client.do_handshake();
        let server_ret = server.do_handshake();
        if client_ret == 1 && server_ret == 1 {
            break;
        }
    }

    for size in [64usize, 1024, 8192] {
        let data = vec![0xa5u8; size];
        let mut buf = vec![0u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                client.write_bytes(ContentType::ApplicationData, &data, size as i32);
                let mut got = 0;
                while got < size {
                    let ret = server.read_bytes(
                        ContentType::ApplicationData,
                        &mut buf[got..],
                        (size - got) as i32,
                        false,
                    );
                    if ret <= 0 {
                        break;
                    }
                    got += ret as usize;
                }
                black_box(got)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_return_code,
    bench_full_write,
    bench_partial_write,
    bench_openssl_round_trip
);
criterion_main!(benches);
