use super::test_firewall;
use crate::addr::IpRange;
use crate::{Error, SetElement};

fn range(s: &str) -> IpRange {
    s.parse().expect(s)
}

fn interval(first: [u8; 4], end: [u8; 4]) -> SetElement {
    SetElement::interval(first.to_vec(), end.to_vec())
}

#[test]
fn duplicate_names_are_refused() {
    let mut firewall = test_firewall();
    assert!(firewall.new_ipset("servers").is_some());
    assert!(firewall.new_ipset("servers").is_none());
    assert!(firewall.find_ipset("servers").is_some());
}

#[test]
fn flush_materializes_members_as_intervals() {
    let mut firewall = test_firewall();

    let ipset = firewall.new_ipset("test-ipset").unwrap();
    for &member in &["192.168.10.1", "192.168.1.0/24", "192.168.6.0-192.168.6.120"] {
        ipset.add_range(range(member));
    }
    firewall.update_ipset("test-ipset").unwrap();

    let set = firewall
        .find_ipset("test-ipset")
        .and_then(|s| s.kernel_set())
        .cloned()
        .expect("set materialized");
    assert_eq!(set.get_name(), Some("ipset-test-ipset"));

    let elements = firewall.session_mut().get_set_elements(&set).unwrap();
    assert_eq!(
        elements,
        vec![
            interval([192, 168, 10, 1], [192, 168, 10, 2]),
            interval([192, 168, 1, 0], [192, 168, 2, 0]),
            interval([192, 168, 6, 0], [192, 168, 6, 121]),
        ]
    );

    let ipset = firewall.find_ipset("test-ipset").unwrap();
    assert!(ipset.will_add.is_empty());
    assert!(ipset.will_delete.is_empty());
    assert_eq!(ipset.members().len(), 3);
}

#[test]
fn overlapping_notations_stay_distinct_members() {
    let mut firewall = test_firewall();

    let members = [
        "192.168.10.1",
        "192.168.11.1",
        "192.168.1.0/24",
        "192.168.100.1/32",
        "192.168.233.1/32",
        "192.168.233.0/24",
        "10.255.255.0/24",
        "11.255.255.254/32",
        "192.168.6.0-192.168.6.120",
    ];

    let ipset = firewall.new_ipset("test-ipset").unwrap();
    for &member in &members {
        ipset.add_range(range(member));
    }
    // adding an existing member twice is a no-op
    ipset.add_range(range("192.168.10.1"));
    assert_eq!(ipset.members().len(), members.len());

    firewall.update_ipset("test-ipset").unwrap();

    let set = firewall
        .find_ipset("test-ipset")
        .and_then(|s| s.kernel_set())
        .cloned()
        .unwrap();
    let elements = firewall.session_mut().get_set_elements(&set).unwrap();
    assert_eq!(elements.len(), members.len());
}

#[test]
fn incremental_flushes_emit_only_the_deltas() {
    let mut firewall = test_firewall();

    let ipset = firewall.new_ipset("lan").unwrap();
    ipset.add_range(range("10.0.0.0/8"));
    firewall.update_ipset("lan").unwrap();

    let ipset = firewall.ipset_mut("lan").unwrap();
    ipset.add_range(range("172.16.0.0/12"));
    ipset.delete_range(range("10.0.0.0/8"));
    firewall.update_ipset("lan").unwrap();

    let set = firewall
        .find_ipset("lan")
        .and_then(|s| s.kernel_set())
        .cloned()
        .unwrap();
    let elements = firewall.session_mut().get_set_elements(&set).unwrap();
    assert_eq!(elements, vec![interval([172, 16, 0, 0], [172, 32, 0, 0])]);
    assert_eq!(
        firewall.find_ipset("lan").unwrap().members(),
        &[range("172.16.0.0/12")]
    );
}

#[test]
fn adding_back_a_pending_deletion_cancels_it() {
    let mut firewall = test_firewall();

    let ipset = firewall.new_ipset("lan").unwrap();
    ipset.add_range(range("10.0.0.0/8"));
    firewall.update_ipset("lan").unwrap();

    let ipset = firewall.ipset_mut("lan").unwrap();
    ipset.delete_range(range("10.0.0.0/8"));
    ipset.add_range(range("10.0.0.0/8"));
    assert!(ipset.will_delete.is_empty());

    firewall.update_ipset("lan").unwrap();
    let set = firewall
        .find_ipset("lan")
        .and_then(|s| s.kernel_set())
        .cloned()
        .unwrap();
    let elements = firewall.session_mut().get_set_elements(&set).unwrap();
    assert_eq!(elements, vec![interval([10, 0, 0, 0], [11, 0, 0, 0])]);
}

#[test]
fn deleting_a_pending_addition_cancels_the_addition() {
    let mut firewall = test_firewall();

    let ipset = firewall.new_ipset("lan").unwrap();
    ipset.add_range(range("10.0.0.0/8"));
    firewall.update_ipset("lan").unwrap();

    // The cancelled addition still leaves a deletion of an element the
    // kernel never saw; the commit is rejected and, as documented, the
    // pending queues are gone with it.
    let ipset = firewall.ipset_mut("lan").unwrap();
    ipset.add_range(range("192.168.0.0/16"));
    ipset.delete_range(range("192.168.0.0/16"));
    assert!(ipset.will_add.is_empty());
    assert_eq!(ipset.will_delete.len(), 1);

    assert!(firewall.update_ipset("lan").is_err());
    let ipset = firewall.find_ipset("lan").unwrap();
    assert!(ipset.will_add.is_empty());
    assert!(ipset.will_delete.is_empty());

    // the committed membership kept the original element
    let set = firewall
        .find_ipset("lan")
        .and_then(|s| s.kernel_set())
        .cloned()
        .unwrap();
    let elements = firewall.session_mut().get_set_elements(&set).unwrap();
    assert_eq!(elements, vec![interval([10, 0, 0, 0], [11, 0, 0, 0])]);
}

#[test]
fn updating_an_unknown_ipset_fails() {
    let mut firewall = test_firewall();
    assert!(matches!(
        firewall.update_ipset("nope"),
        Err(Error::UnknownIpset(_))
    ));
}
