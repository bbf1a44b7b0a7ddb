use crate::addr::{Address, IpRange};

fn range(s: &str) -> IpRange {
    s.parse().expect(s)
}

#[test]
fn net_last_sets_the_host_bits() {
    let want = [
        ("0.0.0.0/0", "255.255.255.255"),
        ("192.168.1.0/24", "192.168.1.255"),
        ("10.255.255.0/24", "10.255.255.255"),
        ("172.16.0.0/12", "172.31.255.255"),
    ];

    for &(net, last) in &want {
        assert_eq!(range(net).last().to_string(), last, "last of {}", net);
    }
}

#[test]
fn net_end_carries_across_octets() {
    let want = [
        ("0.0.0.0/0", "0.0.0.0"),
        ("192.168.1.0/24", "192.168.2.0"),
        ("10.255.255.0/24", "11.0.0.0"),
        ("192.168.255.128/25", "192.169.0.0"),
        ("255.255.255.0/24", "0.0.0.0"),
    ];

    for &(net, end) in &want {
        assert_eq!(range(net).end().to_string(), end, "end of {}", net);
    }
}

#[test]
fn host_and_interval_ends_increment_with_carry() {
    assert_eq!(range("10.0.0.255").end().to_string(), "10.0.1.0");
    assert_eq!(range("255.255.255.255").end().to_string(), "0.0.0.0");
    assert_eq!(
        range("192.168.6.0-192.168.6.120").end().to_string(),
        "192.168.6.121"
    );
}

#[test]
fn first_last_end_are_ordered() {
    for &s in &[
        "10.1.2.3",
        "192.168.1.0/24",
        "10.0.0.0/8",
        "192.168.6.5-192.168.7.9",
    ] {
        let r = range(s);
        assert!(r.first() <= r.last(), "{}", s);
        assert!(u32::from(r.last()) + 1 == u32::from(r.end()), "{}", s);
    }
}

#[test]
fn parser_tries_host_then_cidr_then_interval() {
    assert_eq!(range("10.1.2.3"), IpRange::Host("10.1.2.3".parse().unwrap()));
    assert!(matches!(range("10.1.2.0/24"), IpRange::Net(_)));
    assert!(matches!(
        range("10.1.2.3-10.1.2.9"),
        IpRange::Interval(_, _)
    ));
    // spaces around the dash are tolerated
    assert!(matches!(
        range("10.1.2.3 - 10.1.2.9"),
        IpRange::Interval(_, _)
    ));
}

#[test]
fn cidr_blocks_normalize_to_their_network() {
    let r = range("192.168.1.77/24");
    assert_eq!(r.first().to_string(), "192.168.1.0");
    assert_eq!(r.to_string(), "192.168.1.0/24");
}

#[test]
fn malformed_ranges_are_rejected() {
    for s in &[
        "",
        "not-an-address",
        "300.1.2.3",
        "10.0.0.0/33",
        "10.0.0.1-",
        "-10.0.0.1",
        "10.0.0.1-10.0.0.2-10.0.0.3",
        "10.0.0.1/24/8",
    ] {
        assert!(s.parse::<IpRange>().is_err(), "{:?} should not parse", s);
    }
}

#[test]
fn range_json_round_trips_through_its_string_form() {
    for &s in &["10.1.2.3", "192.168.1.0/24", "10.0.0.1-10.0.0.9"] {
        let r = range(s);
        let encoded = serde_json::to_string(&r).unwrap();
        assert_eq!(encoded, format!("{:?}", s));
        let decoded: IpRange = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, r);
    }
}

#[test]
fn address_json_disambiguates_on_shape() {
    let immediate: Address =
        serde_json::from_str(r#"["10.0.0.1", "192.168.0.0/16"]"#).unwrap();
    assert!(matches!(&immediate, Address::Immediate(ranges) if ranges.len() == 2));

    let reference: Address = serde_json::from_str(r#""servers""#).unwrap();
    assert_eq!(reference, Address::Ipset("servers".to_string()));

    for address in &[immediate, reference] {
        let encoded = serde_json::to_string(address).unwrap();
        let decoded: Address = serde_json::from_str(&encoded).unwrap();
        assert_eq!(&decoded, address);
    }
}

#[test]
fn immediate_address_with_a_bad_range_is_rejected() {
    assert!(serde_json::from_str::<Address>(r#"["10.0.0.1", "nonsense"]"#).is_err());
}
