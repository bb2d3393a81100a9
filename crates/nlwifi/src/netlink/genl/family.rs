//! Family resolution through the generic netlink controller.

use std::collections::HashMap;

use super::{GENL_ID_CTRL, ctrl};
use crate::netlink::attr::{AttrIter, AttrTable, get};
use crate::netlink::error::{Error, Result};
use crate::netlink::tree::AttrNode;

/// Information about a Generic Netlink family.
#[derive(Debug, Clone, Default)]
pub struct FamilyInfo {
    /// Dynamically assigned family ID (used as nlmsg_type).
    pub id: u16,
    /// Family version.
    pub version: u8,
    /// Maximum attribute number.
    pub max_attr: u32,
    /// Multicast groups: name -> group ID.
    pub mcast_groups: HashMap<String, u32>,
}

impl FamilyInfo {
    /// Group id for `name`, if the family exports it.
    pub fn group(&self, name: &str) -> Option<u32> {
        self.mcast_groups.get(name).copied()
    }

    /// Parse the attributes of a CTRL_CMD_NEWFAMILY reply.
    pub fn parse(attrs: &[u8]) -> Result<Self> {
        let table = AttrTable::parse(attrs);
        let id = table
            .u16(ctrl::ATTR_FAMILY_ID)
            .ok_or_else(|| Error::InvalidMessage("missing family ID".into()))?;

        let mut mcast_groups = HashMap::new();
        for (_idx, group) in table.iter_nested(ctrl::ATTR_MCAST_GROUPS) {
            let mut name: Option<String> = None;
            let mut grp_id: Option<u32> = None;
            for (attr_type, payload) in AttrIter::new(group) {
                match attr_type {
                    t if t == ctrl::MCAST_GRP_NAME => {
                        name = Some(get::string(payload)?.to_string());
                    }
                    t if t == ctrl::MCAST_GRP_ID => {
                        grp_id = Some(get::u32_ne(payload)?);
                    }
                    _ => {}
                }
            }
            if let (Some(name), Some(id)) = (name, grp_id) {
                mcast_groups.insert(name, id);
            }
        }

        Ok(Self {
            id,
            version: table.u32(ctrl::ATTR_VERSION).unwrap_or(0) as u8,
            max_attr: table.u32(ctrl::ATTR_MAXATTR).unwrap_or(0),
            mcast_groups,
        })
    }
}

/// Message type, command, version and attributes of a GETFAMILY request.
pub fn get_family_request(name: &str) -> (u16, u8, u8, Vec<AttrNode>) {
    (
        GENL_ID_CTRL,
        ctrl::CMD_GETFAMILY,
        1,
        vec![AttrNode::string(ctrl::ATTR_FAMILY_NAME, name)],
    )
}
