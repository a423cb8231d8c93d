use ferrous_resolver_domain::{Rcode, RecordData, RecordType, SoaRecord};
use ferrous_resolver_infrastructure::dns::wire::{decode_message, Flags, MessageWriter};

/// Id, question name and type of an encoded query.
pub fn query_parts(query: &[u8]) -> (u16, String, RecordType) {
    let message = decode_message(query).expect("query decodes");
    let question = &message.questions[0];
    let record_type = question.record_type().expect("supported qtype");
    (message.id, question.name.clone(), record_type)
}

fn writer(query: &[u8], flags: Flags) -> (MessageWriter, String) {
    let (id, name, record_type) = query_parts(query);
    let mut writer = MessageWriter::new(id, flags);
    writer.question(&name, record_type).unwrap();
    (writer, name)
}

/// NOERROR reply echoing the question with `records` under the query name.
pub fn answer_reply(query: &[u8], ttl: u32, records: &[RecordData]) -> Vec<u8> {
    let (mut writer, name) = writer(query, Flags::response(Rcode::NoError));
    for record in records {
        writer.answer(&name, ttl, record).unwrap();
    }
    writer.finish()
}

pub fn rcode_reply(query: &[u8], rcode: Rcode) -> Vec<u8> {
    writer(query, Flags::response(rcode)).0.finish()
}

/// Empty reply with TC set.
pub fn truncated_reply(query: &[u8]) -> Vec<u8> {
    let flags = Flags {
        tc: true,
        ..Flags::response(Rcode::NoError)
    };
    writer(query, flags).0.finish()
}

/// Reply with `rcode`, no answers and an SOA for `zone` in the authority
/// section.
pub fn nxdomain_reply(
    query: &[u8],
    rcode: Rcode,
    zone: &str,
    soa_ttl: u32,
    minttl: u32,
) -> Vec<u8> {
    let (mut writer, _) = writer(query, Flags::response(rcode));
    let soa = RecordData::SOA(SoaRecord {
        nsname: format!("ns1.{}", zone),
        hostmaster: format!("hostmaster.{}", zone),
        serial: 1,
        refresh: 3600,
        retry: 900,
        expire: 604_800,
        minttl,
    });
    writer.authority(zone, soa_ttl, &soa).unwrap();
    writer.finish()
}
