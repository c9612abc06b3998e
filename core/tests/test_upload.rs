#[cfg(test)]
mod upload_tests {
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;

    use obfs_core::chain::{ObfuscationConfig, ObfuscatorSpec};
    use obfs_core::codec::Algorithm;
    use obfs_core::config::TransferConfig;
    use obfs_core::transfer::memory::TransportCalls;
    use obfs_core::transfer::{
        ByteRange, CancelToken, ConcurrencyMisuseError, MemoryTransport, TransferCoordinator, TransferDirection,
        TransferRegistry, Transport, TransportError,
    };
    use obfs_core::types::TransferError;

    const CHUNK: usize = 64;
    const CHUNKS: usize = 250;
    const FAIL_AT: u64 = 137;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Put(u64),
        Cancel,
        Finish,
    }

    /// Memory endpoint that rejects the put of one chunk and logs every call.
    struct FaultyTransport {
        inner: MemoryTransport,
        fail_at: u64,
        fail_finish: bool,
        events: Mutex<Vec<Event>>,
    }

    impl FaultyTransport {
        fn new(fail_at: u64) -> Self {
            Self {
                inner: MemoryTransport::new(&ObfuscationConfig::empty()).unwrap(),
                fail_at,
                fail_finish: false,
                events: Mutex::new(Vec::new()),
            }
        }

        /// Accepts every put but rejects the final commit.
        fn rejecting_finish() -> Self {
            Self { fail_finish: true, ..Self::new(u64::MAX) }
        }

        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }
    }

    impl Transport for FaultyTransport {
        fn begin_transfer(&self, path: &str, config: &ObfuscationConfig) -> Result<(), TransportError> {
            self.inner.begin_transfer(path, config)
        }

        fn fetch_chunk(&self, path: &str, range: ByteRange) -> Result<Bytes, TransportError> {
            self.inner.fetch_chunk(path, range)
        }

        fn put_chunk(&self, path: &str, range: ByteRange, data: Bytes) -> Result<(), TransportError> {
            let index = range.start / CHUNK as u64;
            self.events.lock().unwrap().push(Event::Put(index));
            if index == self.fail_at {
                return Err(TransportError::request(path, "injected failure"));
            }
            self.inner.put_chunk(path, range, data)
        }

        fn cancel_transfer(&self, path: &str) -> Result<(), TransportError> {
            self.events.lock().unwrap().push(Event::Cancel);
            self.inner.cancel_transfer(path)
        }

        fn finish_transfer(&self, path: &str) -> Result<(), TransportError> {
            self.events.lock().unwrap().push(Event::Finish);
            if self.fail_finish {
                return Err(TransportError::request(path, "commit refused"));
            }
            self.inner.finish_transfer(path)
        }
    }

    fn payload(len: usize) -> Bytes {
        Bytes::from((0..len).map(|i| (i * 7 % 256) as u8).collect::<Vec<u8>>())
    }

    fn chain() -> ObfuscationConfig {
        ObfuscationConfig::new(vec![
            ObfuscatorSpec::new(Algorithm::Deflate),
            ObfuscatorSpec::new(Algorithm::Chacha20).with("key", "upload-key").with("salt", "upload-salt"),
            ObfuscatorSpec::new(Algorithm::Xor).with("key", "x"),
        ])
    }

    fn settings(max_workers: usize) -> TransferConfig {
        TransferConfig::default().with_chunk_size(CHUNK).with_max_workers(max_workers)
    }

    fn coordinator(transport: Arc<dyn Transport>, max_workers: usize) -> TransferCoordinator {
        TransferCoordinator::new(transport, Arc::new(TransferRegistry::new()), settings(max_workers)).unwrap()
    }

    #[test]
    fn upload_round_trips_through_memory_transport() {
        let transport = Arc::new(MemoryTransport::new(&ObfuscationConfig::empty()).unwrap());
        let coord = coordinator(transport.clone(), 4);
        let data = payload(CHUNK * 10 + 5);

        let mut seen = Vec::new();
        let snapshot = coord
            .upload("/up.bin", data.clone(), &chain(), &CancelToken::new(), &mut |p| seen.push(p))
            .unwrap();

        assert_eq!(transport.file("/up.bin").unwrap(), data);
        assert_eq!(snapshot.chunks_completed(), 11);
        assert!(snapshot.is_complete());
        assert!(snapshot.counters.peak_in_flight <= 4);
        assert_eq!(TransportCalls::get(&transport.calls.put), 11);
        assert_eq!(TransportCalls::get(&transport.calls.finish), 1);
        assert_eq!(TransportCalls::get(&transport.calls.cancel), 0);
        assert!(!coord.registry().is_registered("/up.bin"));

        assert_eq!(seen.last(), Some(&None));
        let pcts: Vec<f64> = seen.iter().flatten().copied().collect();
        assert!(pcts.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(pcts.last().copied(), Some(100.0));
    }

    #[test]
    fn empty_payload_uploads_one_chunk() {
        let transport = Arc::new(MemoryTransport::new(&ObfuscationConfig::empty()).unwrap());
        let coord = coordinator(transport.clone(), 2);
        coord.upload("/empty", Bytes::new(), &chain(), &CancelToken::new(), &mut |_| {}).unwrap();
        assert_eq!(transport.file("/empty").unwrap().len(), 0);
        assert_eq!(TransportCalls::get(&transport.calls.put), 1);
    }

    #[test]
    fn failure_with_single_worker_halts_later_chunks() {
        let transport = Arc::new(FaultyTransport::new(FAIL_AT));
        let coord = coordinator(transport.clone(), 1);

        let mut last = Some(0.0);
        let err = coord
            .upload("/big", payload(CHUNK * CHUNKS), &chain(), &CancelToken::new(), &mut |p| last = p)
            .unwrap_err();

        assert_eq!(err.chunk_index(), Some(FAIL_AT));
        let events = transport.events();
        let puts: Vec<u64> = events.iter().filter_map(|e| if let Event::Put(i) = e { Some(*i) } else { None }).collect();
        assert_eq!(puts, (0..=FAIL_AT).collect::<Vec<_>>());
        assert_eq!(events.last(), Some(&Event::Cancel));
        assert_eq!(events.iter().filter(|e| **e == Event::Cancel).count(), 1);
        assert!(!events.contains(&Event::Finish));
        assert_eq!(last, None);
        assert_eq!(coord.registry().transfer_count(), 0);
        assert!(!transport.inner.has_pending_upload("/big"));
    }

    #[test]
    fn failure_with_parallel_workers_settles_before_single_cancel() {
        let transport = Arc::new(FaultyTransport::new(FAIL_AT));
        let coord = coordinator(transport.clone(), 5);

        let err = coord
            .upload("/big", payload(CHUNK * CHUNKS), &chain(), &CancelToken::new(), &mut |_| {})
            .unwrap_err();

        assert_eq!(err.chunk_index(), Some(FAIL_AT));
        assert!(matches!(err, TransferError::Chunk { .. }));

        let events = transport.events();
        let cancel_at = events.iter().position(|e| *e == Event::Cancel).unwrap();
        assert_eq!(cancel_at, events.len() - 1, "no call may follow the cancel");
        assert_eq!(events.iter().filter(|e| **e == Event::Cancel).count(), 1);
        assert!(!events.contains(&Event::Finish));
        assert!(events.contains(&Event::Put(FAIL_AT)));
        assert_eq!(coord.registry().transfer_count(), 0);
    }

    #[test]
    fn failed_finish_cancels_partial_upload() {
        let transport = Arc::new(FaultyTransport::rejecting_finish());
        let coord = coordinator(transport.clone(), 3);

        let mut last = Some(0.0);
        let err = coord
            .upload("/commit", payload(CHUNK * 6), &chain(), &CancelToken::new(), &mut |p| last = p)
            .unwrap_err();

        assert!(matches!(err, TransferError::Transport(TransportError::Request { .. })));
        let events = transport.events();
        assert_eq!(events.iter().filter(|e| matches!(e, Event::Put(_))).count(), 6);
        assert_eq!(&events[events.len() - 2..], &[Event::Finish, Event::Cancel]);
        assert!(!transport.inner.has_pending_upload("/commit"));
        assert!(transport.inner.file("/commit").is_none());
        assert_eq!(last, None);
        assert_eq!(coord.registry().transfer_count(), 0);
    }

    #[test]
    fn cancelled_upload_rolls_back() {
        let transport = Arc::new(MemoryTransport::new(&ObfuscationConfig::empty()).unwrap());
        let coord = coordinator(transport.clone(), 1);
        let token = CancelToken::new();

        let err = coord
            .upload("/c", payload(CHUNK * 50), &chain(), &token, &mut |p| {
                if p.is_some() {
                    token.cancel();
                }
            })
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(TransportCalls::get(&transport.calls.put) < 50);
        assert_eq!(TransportCalls::get(&transport.calls.cancel), 1);
        assert!(transport.file("/c").is_none());
        assert!(!transport.has_pending_upload("/c"));
        assert!(!coord.registry().is_registered("/c"));
    }

    #[test]
    fn misconfigured_chain_fails_before_transport() {
        let transport = Arc::new(MemoryTransport::new(&ObfuscationConfig::empty()).unwrap());
        let coord = coordinator(transport.clone(), 2);
        let bad = ObfuscationConfig::new(vec![ObfuscatorSpec::new(Algorithm::Aes).with("key", "no-salt")]);

        let err = coord.upload("/bad", payload(10), &bad, &CancelToken::new(), &mut |_| {}).unwrap_err();
        assert!(matches!(err, TransferError::Codec(ref e) if e.is_configuration()));
        assert!(!transport.has_pending_upload("/bad"));
        assert_eq!(TransportCalls::get(&transport.calls.put), 0);
        assert_eq!(TransportCalls::get(&transport.calls.cancel), 0);
    }

    #[test]
    fn second_upload_of_same_path_is_misuse() {
        let transport = Arc::new(MemoryTransport::new(&ObfuscationConfig::empty()).unwrap());
        let coord = coordinator(transport, 2);
        coord.registry().register("/busy", TransferDirection::Up).unwrap();

        let err = coord.upload("/busy", payload(10), &chain(), &CancelToken::new(), &mut |_| {}).unwrap_err();
        assert!(matches!(err, TransferError::Misuse(ConcurrencyMisuseError::DuplicateTransfer { .. })));
        assert!(coord.registry().is_registered("/busy"));
    }
}
