//! Tests for reconciliation helpers

#[cfg(test)]
mod tests {
    use crate::reconcile_helpers::*;
    use crate::test_utils::create_test_private_network;
    use crds::*;
    use scaleway_client::PrivateNic;

    fn test_nic() -> PrivateNic {
        PrivateNic {
            id: "nic-1".to_string(),
            server_id: "server-1".to_string(),
            private_network_id: "pn-id".to_string(),
            mac_address: "02:00:00:00:00:01".to_string(),
            state: "available".to_string(),
        }
    }

    #[test]
    fn test_status_needs_update() {
        assert!(status_needs_update(None, NetworkState::Pending, 0, None));

        let current = next_status(None, NetworkState::Ready, 2, None);
        assert!(!status_needs_update(Some(&current), NetworkState::Ready, 2, None));
        assert!(status_needs_update(Some(&current), NetworkState::Ready, 3, None));
        assert!(status_needs_update(Some(&current), NetworkState::Failed, 2, None));
        assert!(status_needs_update(Some(&current), NetworkState::Ready, 2, Some("boom")));
    }

    #[test]
    fn test_next_status_keeps_timestamp_for_same_state() {
        let first = next_status(None, NetworkState::Ready, 1, None);
        assert!(first.last_reconciled.is_some());

        let same_state = next_status(Some(&first), NetworkState::Ready, 2, None);
        assert_eq!(same_state.last_reconciled, first.last_reconciled);
        assert_eq!(same_state.attached_nodes, 2);

        let failed = next_status(Some(&first), NetworkState::Failed, 1, Some("boom".to_string()));
        assert_eq!(failed.state, NetworkState::Failed);
        assert_eq!(failed.error.as_deref(), Some("boom"));
        assert!(failed.last_reconciled >= first.last_reconciled);
    }

    #[test]
    fn test_validate_spec_accepts_valid_network() {
        let mut pn = create_test_private_network("pn-a", "pn-id", "10.0.0.0/24");
        pn.spec.ipam = Some(PrivateNetworkIpam {
            static_ranges: Some(PrivateNetworkIpamStatic {
                available_ranges: vec!["10.0.0.10-10.0.0.20".to_string()],
            }),
        });
        pn.spec.routes = vec![PrivateNetworkRoute {
            to: "192.168.0.0/16".to_string(),
            via: "10.0.0.1".to_string(),
        }];
        assert_eq!(validate_spec(&pn), Ok(()));
    }

    #[test]
    fn test_validate_spec_rejects_bad_fields() {
        let pn = create_test_private_network("pn-a", "", "10.0.0.0/24");
        assert!(validate_spec(&pn).unwrap_err().contains("spec.id"));

        let pn = create_test_private_network("pn-a", "pn-id", "not-a-cidr");
        assert!(validate_spec(&pn).unwrap_err().contains("spec.cidr"));

        let mut pn = create_test_private_network("pn-a", "pn-id", "10.0.0.0/24");
        pn.spec.ipam = Some(PrivateNetworkIpam {
            static_ranges: Some(PrivateNetworkIpamStatic {
                available_ranges: vec!["10.0.1.10-10.0.1.20".to_string()],
            }),
        });
        assert!(validate_spec(&pn).unwrap_err().contains("not inside"));

        let mut pn = create_test_private_network("pn-a", "pn-id", "10.0.0.0/24");
        pn.spec.routes = vec![PrivateNetworkRoute {
            to: "192.168.0.0/16".to_string(),
            via: "172.16.0.1".to_string(),
        }];
        assert!(validate_spec(&pn).unwrap_err().contains("spec.routes.via"));
    }

    #[test]
    fn test_build_network_interface() {
        let pn = create_test_private_network("pn-a", "pn-id", "10.0.0.0/24");
        let nic = build_network_interface(&pn, "node-1", "10.0.0.2/24".to_string(), &test_nic()).unwrap();

        assert_eq!(nic.metadata.generate_name.as_deref(), Some("pn-a-"));
        assert!(nic.metadata.name.is_none());

        let labels = nic.metadata.labels.clone().unwrap();
        assert_eq!(labels.get(PRIVATE_NETWORK_LABEL).map(String::as_str), Some("pn-a"));
        assert_eq!(labels.get(NODE_LABEL).map(String::as_str), Some("node-1"));
        // inherited from the parent
        assert_eq!(labels.get("team").map(String::as_str), Some("net"));

        assert!(has_finalizer(&nic.metadata, FINALIZER));
        assert!(has_finalizer(&nic.metadata, IP_FINALIZER));

        let owners = nic.metadata.owner_references.clone().unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].name, "pn-a");
        assert_eq!(owners[0].kind, "PrivateNetwork");
        assert_eq!(owners[0].controller, Some(true));

        assert_eq!(nic.spec.node_name, "node-1");
        assert_eq!(nic.spec.address, "10.0.0.2/24");
        assert_eq!(nic.spec.id, "nic-1");
        assert_eq!(
            nic.status.unwrap().mac_address.as_deref(),
            Some("02:00:00:00:00:01")
        );
    }

    #[test]
    fn test_build_network_interface_requires_uid() {
        let mut pn = create_test_private_network("pn-a", "pn-id", "10.0.0.0/24");
        pn.metadata.uid = None;
        let err = build_network_interface(&pn, "node-1", "10.0.0.2/24".to_string(), &test_nic()).unwrap_err();
        assert!(err.to_string().contains("uid"));
    }

    #[test]
    fn test_label_pairs() {
        assert_eq!(network_labels("pn-a"), [(PRIVATE_NETWORK_LABEL, "pn-a")]);
        assert_eq!(
            interface_labels("pn-a", "node-1"),
            [(PRIVATE_NETWORK_LABEL, "pn-a"), (NODE_LABEL, "node-1")]
        );
    }
}
