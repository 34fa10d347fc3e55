/// Key layout and encoding utilities for Fjall partitions
///
/// Partition structure:
/// - `people`: person:{person_id} -> Person (JSON)
/// - `emails`: email:{email}:{person_id} -> empty (unique index, scanned by prefix)
/// - `events`: event:{event_id} -> Event (JSON)
/// - `timeline`: {seq} (big-endian u64) -> event_id
/// - `participation`: part:{person_id}:{seq:016} -> event_id
/// - `metadata`: meta:{key} -> value
use uuid::Uuid;

/// Encode a person key: person:{person_id}
pub fn encode_person_key(id: &Uuid) -> Vec<u8> {
    format!("person:{}", id).into_bytes()
}

/// Encode an email index key: email:{email}:{person_id}
pub fn encode_email_key(email: &str, id: &Uuid) -> Vec<u8> {
    format!("email:{}:{}", email, id).into_bytes()
}

/// Encode an email prefix for range scan: email:{email}:
pub fn encode_email_prefix(email: &str) -> Vec<u8> {
    format!("email:{}:", email).into_bytes()
}

/// Decode the person id from an email index key, given the scanned email.
///
/// Returns `None` when the remainder is not exactly a uuid, which filters out
/// longer emails that share the scanned prefix.
pub fn decode_email_key(key: &[u8], email: &str) -> Option<Uuid> {
    let key_str = std::str::from_utf8(key).ok()?;
    let rest = key_str.strip_prefix("email:")?.strip_prefix(email)?;
    let id = rest.strip_prefix(':')?;
    Uuid::parse_str(id).ok()
}

/// Encode an event key: event:{event_id}
pub fn encode_event_key(id: &Uuid) -> Vec<u8> {
    format!("event:{}", id).into_bytes()
}

/// Encode a timeline key; big-endian so byte order matches creation order.
pub fn encode_timeline_key(seq: u64) -> [u8; 8] {
    seq.to_be_bytes()
}

/// Encode a participation key: part:{person_id}:{seq:016}
pub fn encode_participation_key(person: &Uuid, seq: u64) -> Vec<u8> {
    format!("part:{}:{:016}", person, seq).into_bytes()
}

/// Encode a participation prefix for range scan: part:{person_id}:
pub fn encode_participation_prefix(person: &Uuid) -> Vec<u8> {
    format!("part:{}:", person).into_bytes()
}

/// Decode a participation key: part:{person_id}:{seq:016} -> (person_id, seq)
pub fn decode_participation_key(key: &[u8]) -> Option<(Uuid, u64)> {
    let key_str = std::str::from_utf8(key).ok()?;
    let (person, seq) = key_str.strip_prefix("part:")?.rsplit_once(':')?;
    Some((Uuid::parse_str(person).ok()?, seq.parse().ok()?))
}

/// Encode a metadata key: meta:{key}
pub fn encode_meta_key(key: &str) -> Vec<u8> {
    format!("meta:{}", key).into_bytes()
}

/// Decode an id stored as a partition value.
pub fn decode_id(value: &[u8]) -> Option<Uuid> {
    let id = std::str::from_utf8(value).ok()?;
    Uuid::parse_str(id).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_id() -> Uuid {
        Uuid::parse_str("0190b6a8-3c1e-7000-8000-000000000001").unwrap()
    }

    #[test]
    fn test_person_key_encoding() {
        let key = encode_person_key(&sample_id());
        assert_eq!(key, b"person:0190b6a8-3c1e-7000-8000-000000000001");
    }

    #[test]
    fn test_email_key_decoding() {
        let id = sample_id();
        let key = encode_email_key("a@example.com", &id);
        assert!(key.starts_with(&encode_email_prefix("a@example.com")));
        assert_eq!(decode_email_key(&key, "a@example.com"), Some(id));
    }

    #[test]
    fn test_email_prefix_does_not_capture_longer_email() {
        // "email:a:" is also a prefix of the index entry for "a:b"
        let key = encode_email_key("a:b", &sample_id());
        assert!(key.starts_with(&encode_email_prefix("a")));
        assert_eq!(decode_email_key(&key, "a"), None);
    }

    #[test]
    fn test_timeline_key_orders_numerically() {
        assert!(encode_timeline_key(255) < encode_timeline_key(256));
        assert!(encode_timeline_key(1) < encode_timeline_key(1 << 40));
    }

    #[test]
    fn test_participation_key_encoding() {
        let id = sample_id();
        let key = encode_participation_key(&id, 42);
        assert_eq!(
            key,
            b"part:0190b6a8-3c1e-7000-8000-000000000001:0000000000000042"
        );
        assert!(key.starts_with(&encode_participation_prefix(&id)));
        assert_eq!(decode_participation_key(&key), Some((id, 42)));
    }

    #[test]
    fn test_meta_key_encoding() {
        assert_eq!(encode_meta_key("next_seq"), b"meta:next_seq");
    }

    #[test]
    fn test_decode_id() {
        let id = sample_id();
        assert_eq!(decode_id(id.to_string().as_bytes()), Some(id));
        assert_eq!(decode_id(b"not-a-uuid"), None);
    }
}
