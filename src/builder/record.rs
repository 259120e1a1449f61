//! Source records: one network with its origin AS.

use ipnet::IpNet;

use super::encode::Value;

/// Map key for the AS number.
pub const ASN_KEY: &str = "autonomous_system_number";

/// Map key for the AS organization name.
pub const ORGANIZATION_KEY: &str = "autonomous_system_organization";

/// A network and the autonomous system that originates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    /// Network, with host bits cleared
    pub network: IpNet,
    /// AS number (0 when unknown)
    pub asn: u32,
    /// Organization name (may be empty)
    pub organization: String,
}

impl SourceRecord {
    /// Create a record. Host bits of `network` are cleared.
    pub fn new(network: IpNet, asn: u32, organization: &str) -> Self {
        Self {
            network: network.trunc(),
            asn,
            organization: organization.to_string(),
        }
    }

    /// Data-section value: zero ASN and empty organization are omitted.
    pub fn to_value(&self) -> Value {
        let mut entries = Vec::with_capacity(2);
        if self.asn != 0 {
            entries.push((ASN_KEY.to_string(), Value::Uint32(self.asn)));
        }
        if !self.organization.is_empty() {
            entries.push((
                ORGANIZATION_KEY.to_string(),
                Value::String(self.organization.clone()),
            ));
        }
        Value::Map(entries)
    }

    /// Position of the network in the 128-bit tree: `(bits, prefix_len)`.
    ///
    /// IPv4 networks live under `::/96`.
    pub fn tree_key(&self) -> (u128, u8) {
        match self.network {
            IpNet::V4(net) => (u32::from(net.network()) as u128, 96 + net.prefix_len()),
            IpNet::V6(net) => (u128::from(net.network()), net.prefix_len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_truncates_host_bits() {
        let record = SourceRecord::new("172.20.1.7/24".parse().unwrap(), 1, "X");
        assert_eq!(record.network.to_string(), "172.20.1.0/24");
    }

    #[test]
    fn test_to_value_omits_empty_fields() {
        let record = SourceRecord::new("10.0.0.0/8".parse().unwrap(), 0, "");
        assert_eq!(record.to_value(), Value::Map(Vec::new()));

        let record = SourceRecord::new("10.0.0.0/8".parse().unwrap(), 64512, "");
        assert_eq!(
            record.to_value(),
            Value::Map(vec![(ASN_KEY.to_string(), Value::Uint32(64512))])
        );
    }

    #[test]
    fn test_tree_key() {
        let v4 = SourceRecord::new("10.0.0.0/8".parse().unwrap(), 1, "");
        assert_eq!(v4.tree_key(), (0x0a00_0000, 104));

        let v6 = SourceRecord::new("fd00::/8".parse().unwrap(), 1, "");
        assert_eq!(v6.tree_key(), (0xfd_u128 << 120, 8));
    }
}
