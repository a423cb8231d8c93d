use ferrous_resolver_domain::{
    CaaRecord, DomainError, MxRecord, Rcode, RecordData, RecordType, SoaRecord, SrvRecord,
};
use ferrous_resolver_infrastructure::dns::wire::{
    decode_message, decode_name, encode_name, encode_query, parse_rdata, write_name,
    CompressionTable, Flags, MessageWriter,
};
use std::net::{Ipv4Addr, Ipv6Addr};

#[test]
fn test_name_round_trip() {
    let long_label = "a".repeat(63);
    let names = [
        "example.com".to_string(),
        "a.b.c.d.e.f.example.org".to_string(),
        format!("{}.example", long_label),
        "xn--bcher-kva.example".to_string(),
    ];
    for name in &names {
        let encoded = encode_name(name).unwrap();
        let (decoded, next) = decode_name(&encoded, 0).unwrap();
        assert_eq!(&decoded, name);
        assert_eq!(next, encoded.len());
    }
}

#[test]
fn test_query_round_trip_for_every_type() {
    let types = [
        RecordType::A,
        RecordType::AAAA,
        RecordType::MX,
        RecordType::TXT,
        RecordType::CNAME,
        RecordType::NS,
        RecordType::SRV,
        RecordType::PTR,
        RecordType::SOA,
        RecordType::CAA,
    ];
    for (i, record_type) in types.into_iter().enumerate() {
        let id = 1000 + i as u16;
        let query = encode_query(id, "_sip._tcp.example.com", record_type, true).unwrap();
        let message = decode_message(&query).unwrap();
        assert_eq!(message.id, id);
        assert!(!message.is_response());
        assert_eq!(message.questions.len(), 1);
        assert_eq!(message.questions[0].name, "_sip._tcp.example.com");
        assert_eq!(message.questions[0].record_type(), Some(record_type));
    }
}

#[test]
fn test_shared_suffix_is_a_two_byte_pointer() {
    let mut buf = vec![0u8; 12];
    let mut table = CompressionTable::new();

    write_name(&mut buf, "www.example.com", Some(&mut table)).unwrap();
    let second_at = buf.len();
    write_name(&mut buf, "example.com", Some(&mut table)).unwrap();

    assert_eq!(buf.len() - second_at, 2);
    assert_eq!(buf[second_at] & 0xC0, 0xC0);
    assert_eq!(decode_name(&buf, 12).unwrap().0, "www.example.com");
    assert_eq!(
        decode_name(&buf, second_at).unwrap(),
        ("example.com".to_string(), second_at + 2)
    );
}

#[test]
fn test_self_referencing_pointer_fails() {
    let mut buf = vec![0u8; 12];
    buf.extend_from_slice(&[0xC0, 12]);
    assert!(matches!(
        decode_name(&buf, 12),
        Err(DomainError::MalformedMessage(_))
    ));
}

#[test]
fn test_full_reply_parses_every_record_type() {
    let records = vec![
        RecordData::A(Ipv4Addr::new(93, 184, 216, 34)),
        RecordData::AAAA(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)),
        RecordData::MX(MxRecord {
            priority: 10,
            exchange: "mail.example.com".into(),
        }),
        RecordData::TXT("v=spf1 -all".into()),
        RecordData::CNAME("alias.example.com".into()),
        RecordData::NS("ns1.example.com".into()),
        RecordData::SRV(SrvRecord {
            priority: 1,
            weight: 5,
            port: 5060,
            target: "sip.example.com".into(),
        }),
        RecordData::PTR("host.example.com".into()),
        RecordData::SOA(SoaRecord {
            nsname: "ns1.example.com".into(),
            hostmaster: "hostmaster.example.com".into(),
            serial: 2024010101,
            refresh: 7200,
            retry: 3600,
            expire: 1_209_600,
            minttl: 300,
        }),
        RecordData::CAA(CaaRecord {
            critical: false,
            tag: "issue".into(),
            value: "letsencrypt.org".into(),
        }),
    ];

    let mut writer = MessageWriter::new(0xBEEF, Flags::response(Rcode::NoError));
    writer.question("example.com", RecordType::A).unwrap();
    for (i, record) in records.iter().enumerate() {
        writer.answer("example.com", 100 + i as u32, record).unwrap();
    }
    let bytes = writer.finish();

    let message = decode_message(&bytes).unwrap();
    assert_eq!(message.id, 0xBEEF);
    assert!(message.is_response());
    assert_eq!(message.answers.len(), records.len());

    for (rr, expected) in message.answers.iter().zip(&records) {
        assert_eq!(rr.name, "example.com");
        assert_eq!(rr.record_type(), Some(expected.record_type()));
        assert_eq!(&parse_rdata(&bytes, rr).unwrap(), expected);
    }
}

#[test]
fn test_truncated_message_is_malformed() {
    let mut writer = MessageWriter::new(7, Flags::response(Rcode::NoError));
    writer.question("example.com", RecordType::A).unwrap();
    writer
        .answer("example.com", 60, &RecordData::A(Ipv4Addr::LOCALHOST))
        .unwrap();
    let bytes = writer.finish();

    for cut in [5, 12, 20, bytes.len() - 1] {
        assert!(
            matches!(
                decode_message(&bytes[..cut]),
                Err(DomainError::MalformedMessage(_))
            ),
            "cut at {cut}"
        );
    }
}
