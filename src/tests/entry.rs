use super::{chain_rules, tagged_order, test_firewall};
use crate::addr::{Address, IpRange};
use crate::expr::ExpressionVariant;
use crate::nat::{DnatRule, SnatRule, SnatTarget};
use crate::policy::{Policy, PolicyAction};
use crate::{Error, Firewall};

fn policy(name: &str, action: PolicyAction) -> Policy {
    Policy {
        name: name.to_string(),
        action,
        ..Default::default()
    }
}

fn forward_order(firewall: &mut Firewall) -> Vec<u64> {
    let chain = firewall.forward_chain().clone();
    tagged_order(firewall, &chain)
}

#[test]
fn appends_preserve_insertion_order() {
    let mut firewall = test_firewall();

    let p1 = firewall.append_policy(policy("p1", PolicyAction::Accept)).unwrap();
    let p2 = firewall.append_policy(policy("p2", PolicyAction::Accept)).unwrap();
    let p3 = firewall.append_policy(policy("p3", PolicyAction::Drop)).unwrap();

    assert_eq!((p1, p2, p3), (1, 2, 3));
    assert_eq!(forward_order(&mut firewall), vec![1, 2, 3]);

    let listed: Vec<u64> = firewall.policies().iter().map(|p| p.id).collect();
    assert_eq!(listed, vec![1, 2, 3]);
}

#[test]
fn moves_and_removals_keep_kernel_order_in_sync() {
    let mut firewall = test_firewall();

    let p1 = firewall.append_policy(policy("p1", PolicyAction::Accept)).unwrap();
    firewall.append_policy(policy("p2", PolicyAction::Accept)).unwrap();
    let p3 = firewall.append_policy(policy("p3", PolicyAction::Drop)).unwrap();

    let moved = firewall.policies().last().unwrap().clone();
    let id = firewall.update_policy(moved, Some(p1)).unwrap();
    assert_eq!(id, p3, "a move keeps the entry id");
    assert_eq!(forward_order(&mut firewall), vec![3, 1, 2]);

    firewall.remove_policy(p1).unwrap();
    assert_eq!(forward_order(&mut firewall), vec![3, 2]);
}

#[test]
fn update_without_anchor_stays_in_place() {
    let mut firewall = test_firewall();

    firewall.append_policy(policy("first", PolicyAction::Accept)).unwrap();
    firewall.append_policy(policy("second", PolicyAction::Accept)).unwrap();

    let mut changed = firewall.policies()[0].clone();
    changed.action = PolicyAction::Drop;
    firewall.update_policy(changed, None).unwrap();

    assert_eq!(forward_order(&mut firewall), vec![1, 2]);

    let chain = firewall.forward_chain().clone();
    let rules = chain_rules(&mut firewall, &chain);
    let first = rules.iter().find(|r| r.tag() == Some(1)).unwrap();
    assert!(matches!(
        first.exprs.last(),
        Some(ExpressionVariant::Verdict(crate::expr::Verdict::Drop))
    ));
}

#[test]
fn unknown_before_index_appends() {
    let mut firewall = test_firewall();

    firewall.append_policy(policy("a", PolicyAction::Accept)).unwrap();
    firewall
        .insert_policy_before(policy("b", PolicyAction::Accept), 999)
        .unwrap();

    assert_eq!(forward_order(&mut firewall), vec![1, 2]);
}

#[test]
fn ids_are_never_reused() {
    let mut firewall = test_firewall();

    firewall.append_policy(policy("a", PolicyAction::Accept)).unwrap();
    let b = firewall.append_policy(policy("b", PolicyAction::Accept)).unwrap();
    firewall.remove_policy(b).unwrap();
    let c = firewall.append_policy(policy("c", PolicyAction::Accept)).unwrap();

    assert_eq!(c, 3);
    assert_eq!(forward_order(&mut firewall), vec![1, 3]);
}

#[test]
fn removing_an_unknown_id_fails() {
    let mut firewall = test_firewall();
    assert!(matches!(
        firewall.remove_policy(42),
        Err(Error::EntryNotFound(42))
    ));
}

#[test]
fn rule_tags_survive_commit_cycles() {
    let mut firewall = test_firewall();

    let id = firewall
        .append_policy(policy("tagged", PolicyAction::Accept))
        .unwrap();
    let moved = firewall.policies()[0].clone();
    firewall.update_policy(moved, None).unwrap();

    let chain = firewall.forward_chain().clone();
    let observed = chain_rules(&mut firewall, &chain)
        .into_iter()
        .filter(|r| r.tag() == Some(id))
        .count();
    let recorded = firewall.policy_table().rules_for(id).unwrap().len();
    assert_eq!(observed, recorded);
    assert_eq!(recorded, 1);
}

#[test]
fn the_established_seed_rule_is_untagged() {
    let mut firewall = test_firewall();
    firewall.append_policy(policy("p", PolicyAction::Accept)).unwrap();

    let chain = firewall.forward_chain().clone();
    let rules = chain_rules(&mut firewall, &chain);
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].tag(), None, "conntrack seed carries no tag");
}

#[test]
fn unresolved_ipset_references_fail_validation() {
    let mut firewall = test_firewall();

    let mut wanted = policy("needs-servers", PolicyAction::Accept);
    wanted.source = Some(Address::Ipset("servers".to_string()));

    match firewall.append_policy(wanted.clone()) {
        Err(Error::UnknownIpset(name)) => assert_eq!(name, "servers"),
        other => panic!("expected UnknownIpset, got {:?}", other),
    }
    assert_eq!(forward_order(&mut firewall), Vec::<u64>::new());

    // create the referenced set and retry
    let ipset = firewall.new_ipset("servers").unwrap();
    ipset.add_range("192.168.234.0/24".parse::<IpRange>().unwrap());
    firewall.update_ipset("servers").unwrap();

    let id = firewall.append_policy(wanted).unwrap();
    let rules = firewall.policy_table().rules_for(id).unwrap();
    let lookup = rules[0].exprs.iter().find_map(|e| match e {
        ExpressionVariant::Lookup(lookup) => Some(lookup.set.clone()),
        _ => None,
    });
    assert_eq!(lookup.as_deref(), Some("ipset-servers"));
}

#[test]
fn immediate_addresses_become_anonymous_sets() {
    let mut firewall = test_firewall();

    let mut p = policy("inline", PolicyAction::Accept);
    p.source = Some(Address::Immediate(vec![
        "10.0.0.0/8".parse().unwrap(),
        "192.168.6.0-192.168.6.120".parse().unwrap(),
    ]));
    let id = firewall.append_policy(p).unwrap();

    let rules = firewall.policy_table().rules_for(id).unwrap().to_vec();
    let set_name = rules[0]
        .exprs
        .iter()
        .find_map(|e| match e {
            ExpressionVariant::Lookup(lookup) => Some(lookup.set.clone()),
            _ => None,
        })
        .expect("source lookup emitted");
    assert!(set_name.starts_with("__set"));

    let session = firewall.session_mut();
    let set = crate::Set {
        table: "yafw".to_string(),
        name: set_name,
        ..Default::default()
    };
    assert_eq!(session.get_set_elements(&set).unwrap().len(), 2);
}

#[test]
fn zone_references_resolve_to_zone_sets() {
    let mut firewall = test_firewall();
    firewall.add_zone("wan").unwrap();
    firewall
        .assign_interface(
            &crate::Interface {
                name: "eth9".to_string(),
                index: 9,
            },
            "wan",
        )
        .unwrap();

    let mut p = policy("from-wan", PolicyAction::Drop);
    p.source_zone = Some("wan".to_string());
    let id = firewall.append_policy(p).unwrap();

    let rules = firewall.policy_table().rules_for(id).unwrap();
    let lookup = rules[0].exprs.iter().find_map(|e| match e {
        ExpressionVariant::Lookup(lookup) => Some(lookup.set.clone()),
        _ => None,
    });
    assert_eq!(lookup.as_deref(), Some("zone-wan"));

    let mut unknown = policy("from-nowhere", PolicyAction::Drop);
    unknown.source_zone = Some("nowhere".to_string());
    assert!(matches!(
        firewall.append_policy(unknown),
        Err(Error::UnknownZone(_))
    ));
}

#[test]
fn snat_masquerade_rules_reach_the_postrouting_chain() {
    let mut firewall = test_firewall();

    let rule = SnatRule {
        description: "lan egress".to_string(),
        egress: Some("lo".to_string()),
        ..Default::default()
    };
    let id = firewall.append_snat_rule(rule).unwrap();

    let chain = firewall.postrouting_chain().clone();
    assert_eq!(tagged_order(&mut firewall, &chain), vec![id]);

    let rules = firewall.snat_table().rules_for(id).unwrap();
    assert!(rules[0]
        .exprs
        .iter()
        .any(|e| matches!(e, ExpressionVariant::Masquerade(_))));
}

#[test]
fn disabled_snat_rules_emit_no_nat_statement() {
    let mut firewall = test_firewall();

    let rule = SnatRule {
        enabled: false,
        egress: Some("lo".to_string()),
        ..Default::default()
    };
    let id = firewall.append_snat_rule(rule).unwrap();

    let rules = firewall.snat_table().rules_for(id).unwrap();
    assert_eq!(rules.len(), 1, "a disabled rule keeps its slot");
    assert!(!rules[0]
        .exprs
        .iter()
        .any(|e| matches!(e, ExpressionVariant::Masquerade(_))));
}

#[test]
fn specific_snat_target_is_unimplemented() {
    let mut firewall = test_firewall();

    let rule = SnatRule {
        target: SnatTarget::Specific,
        ..Default::default()
    };
    assert!(matches!(
        firewall.append_snat_rule(rule),
        Err(Error::SnatTargetUnimplemented)
    ));
}

#[test]
fn dnat_entries_are_a_stub() {
    let mut firewall = test_firewall();

    assert!(matches!(
        firewall.append_dnat_rule(DnatRule::default()),
        Err(Error::DnatUnimplemented)
    ));

    let chain = firewall.prerouting_chain().clone();
    assert_eq!(chain_rules(&mut firewall, &chain).len(), 0);
}
