#[cfg(test)]
mod codec_tests {
    use obfs_core::codec::{catalog, create_codec, resolve, resolve_id, Algorithm, CodecError};
    use serde_json::{json, Map, Value};

    fn params(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn valid_params(algorithm: Algorithm) -> Map<String, Value> {
        match algorithm {
            Algorithm::Xor => params(json!({ "key": "k" })),
            Algorithm::Base64 => params(json!({ "rounds": 2 })),
            Algorithm::Deflate => params(json!({ "level": 9 })),
            _ => params(json!({ "key": "secret", "salt": [1, 2, 3, 4] })),
        }
    }

    #[test]
    fn every_algorithm_round_trips() {
        let inputs: [&[u8]; 4] = [b"", b"x", b"hello world", &[0u8, 255, 10, 13, 0, 0]];
        for algorithm in Algorithm::ALL {
            let codec = create_codec(algorithm, &valid_params(algorithm)).unwrap();
            for input in inputs {
                let wire = codec.obfuscate(input).unwrap();
                assert_eq!(codec.deobfuscate(&wire).unwrap(), input, "{algorithm}");
            }
        }
    }

    #[test]
    fn missing_key_is_configuration_error() {
        for algorithm in [Algorithm::Xor, Algorithm::Aes, Algorithm::Blowfish, Algorithm::Twofish, Algorithm::Chacha20] {
            let err = create_codec(algorithm, &Map::new()).err().unwrap();
            assert!(err.is_configuration(), "{algorithm}: {err}");
        }
    }

    #[test]
    fn block_ciphers_require_salt() {
        for algorithm in [Algorithm::Aes, Algorithm::Blowfish, Algorithm::Twofish, Algorithm::Chacha20] {
            let err = create_codec(algorithm, &params(json!({ "key": "k" }))).err().unwrap();
            assert!(matches!(err, CodecError::Configuration { .. }), "{algorithm}");
        }
    }

    #[test]
    fn invalid_optional_parameters_rejected() {
        assert!(create_codec(Algorithm::Base64, &params(json!({ "rounds": 0 }))).is_err());
        assert!(create_codec(Algorithm::Deflate, &params(json!({ "level": 10 }))).is_err());
    }

    #[test]
    fn unknown_algorithm_is_distinguishable() {
        let err = resolve("rot13").unwrap_err();
        assert!(err.is_unknown_algorithm());
        assert!(!err.is_configuration());
        assert!(resolve_id(0xFFFF).unwrap_err().is_unknown_algorithm());
    }

    #[test]
    fn catalog_lists_every_algorithm_once() {
        let names: Vec<&str> = catalog().iter().map(|c| c.name).collect();
        assert_eq!(names.len(), Algorithm::ALL.len());
        for algorithm in Algorithm::ALL {
            assert_eq!(resolve(algorithm.name()).unwrap().algorithm, algorithm);
            assert_eq!(resolve_id(algorithm.id()).unwrap().algorithm, algorithm);
        }
    }

    #[test]
    fn wrong_key_fails_as_transform_error() {
        let good = create_codec(Algorithm::Aes, &params(json!({ "key": "a", "salt": "s" }))).unwrap();
        let bad = create_codec(Algorithm::Aes, &params(json!({ "key": "b", "salt": "s" }))).unwrap();
        let wire = good.obfuscate(b"payload").unwrap();
        assert!(bad.deobfuscate(&wire).unwrap_err().is_transform());
    }

    #[test]
    fn text_and_byte_array_keys_are_equivalent() {
        let text = create_codec(Algorithm::Xor, &params(json!({ "key": "AB" }))).unwrap();
        let bytes = create_codec(Algorithm::Xor, &params(json!({ "key": [65, 66] }))).unwrap();
        assert_eq!(text.obfuscate(b"hello").unwrap(), bytes.obfuscate(b"hello").unwrap());
    }

    #[test]
    fn keyed_ciphers_are_nondeterministic_but_interoperable() {
        let p = params(json!({ "key": "k", "salt": "s" }));
        let a = create_codec(Algorithm::Chacha20, &p).unwrap();
        let b = create_codec(Algorithm::Chacha20, &p).unwrap();
        let w1 = a.obfuscate(b"same").unwrap();
        let w2 = a.obfuscate(b"same").unwrap();
        assert_ne!(w1, w2);
        assert_eq!(b.deobfuscate(&w1).unwrap(), b"same");
    }
}
