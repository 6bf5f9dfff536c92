//! The cacheable authorization query.

use std::collections::BTreeSet;
use std::sync::Arc;

use authgraph_core::error::GraphResult;
use authgraph_core::query::{
    CacheDecodeError, InvalidCacheKeyError, KEY_SEPARATOR, Queryable, WILDCARD,
};
use authgraph_core::vertex::VertexType;
use authgraph_graph::GroupsGraph;

/// An authorization resolution for one principal and optional delegation
/// chain, representable as a cache entry.
pub struct AuthorizationQuery {
    graph: Arc<GroupsGraph>,
    vertex_type: VertexType,
    principal: String,
    chain: Option<Vec<String>>,
}

impl AuthorizationQuery {
    pub fn new(
        graph: Arc<GroupsGraph>,
        vertex_type: VertexType,
        principal: impl Into<String>,
        chain: Option<Vec<String>>,
    ) -> Self {
        Self {
            graph,
            vertex_type,
            principal: principal.into(),
            chain,
        }
    }

    pub fn vertex_type(&self) -> VertexType {
        self.vertex_type
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn chain(&self) -> Option<&[String]> {
        self.chain.as_deref()
    }

    fn chain_segment(&self) -> Option<String> {
        match &self.chain {
            Some(chain) if !chain.is_empty() => Some(chain.join(",")),
            _ => None,
        }
    }
}

impl Queryable for AuthorizationQuery {
    type Value = BTreeSet<u64>;

    /// `TYPE:principal` or, with a delegation chain,
    /// `TYPE:principal:app1,app2`. An absent chain and an empty chain
    /// serialize identically.
    fn key(&self) -> String {
        let mut key = format!(
            "{}{}{}",
            self.vertex_type, KEY_SEPARATOR, self.principal
        );
        if let Some(chain) = self.chain_segment() {
            key.push_str(KEY_SEPARATOR);
            key.push_str(&chain);
        }
        key
    }

    fn wildcard_key(&self) -> String {
        format!(
            "{}{}{}{}",
            self.vertex_type, KEY_SEPARATOR, self.principal, WILDCARD
        )
    }

    fn update_from_key(&mut self, key: &str) -> Result<(), InvalidCacheKeyError> {
        let parts: Vec<&str> = key.split(KEY_SEPARATOR).collect();
        if parts.len() < 2 {
            return Err(InvalidCacheKeyError::new(
                key,
                format!("invalid number of key elements: {}", parts.len()),
            ));
        }

        self.vertex_type = parts[0]
            .parse()
            .map_err(|_| InvalidCacheKeyError::new(key, "unknown vertex type segment"))?;
        self.principal = parts[1].to_string();
        self.chain = (parts.len() > 2)
            .then(|| parts[2].split(',').map(str::to_string).collect());
        Ok(())
    }

    fn run(&self) -> GraphResult<Self::Value> {
        self.graph.authorizations(
            self.vertex_type,
            &self.principal,
            self.chain.as_deref().unwrap_or(&[]),
        )
    }

    fn invalid_result(&self) -> Self::Value {
        BTreeSet::new()
    }

    fn to_cacheable(&self, value: &Self::Value) -> Vec<String> {
        value.iter().map(u64::to_string).collect()
    }

    fn from_cacheable(&self, members: &[String]) -> Result<Self::Value, CacheDecodeError> {
        members
            .iter()
            .map(|member| {
                member
                    .parse::<u64>()
                    .map_err(|_| CacheDecodeError(member.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authgraph_graph::InProcessAllocator;
    use proptest::prelude::*;

    fn graph() -> Arc<GroupsGraph> {
        Arc::new(GroupsGraph::new(Arc::new(InProcessAllocator::new())).unwrap())
    }

    fn query(
        vertex_type: VertexType,
        principal: &str,
        chain: Option<Vec<String>>,
    ) -> AuthorizationQuery {
        AuthorizationQuery::new(graph(), vertex_type, principal, chain)
    }

    #[test]
    fn key_omits_absent_and_empty_chains() {
        let absent = query(VertexType::User, "jared", None);
        let empty = query(VertexType::User, "jared", Some(Vec::new()));
        assert_eq!(absent.key(), "USER:jared");
        assert_eq!(absent.key(), empty.key());
    }

    #[test]
    fn key_appends_the_comma_joined_chain() {
        let q = query(
            VertexType::User,
            "jared",
            Some(vec!["APP".into(), "OTHER".into()]),
        );
        assert_eq!(q.key(), "USER:jared:APP,OTHER");
    }

    #[test]
    fn wildcard_key_matches_every_chain_variant() {
        let q = query(VertexType::AppUser, "APP", None);
        assert_eq!(q.wildcard_key(), "APP_USER:APP*");
    }

    #[test]
    fn short_keys_are_rejected() {
        let mut q = query(VertexType::User, "jared", None);
        let err = q.update_from_key("USER").unwrap_err();
        assert!(err.to_string().contains("invalid number of key elements"));
    }

    #[test]
    fn unknown_type_segment_is_rejected() {
        let mut q = query(VertexType::User, "jared", None);
        assert!(q.update_from_key("MYSTERY:jared").is_err());
    }

    #[test]
    fn malformed_members_fail_decoding() {
        let q = query(VertexType::User, "jared", None);
        let err = q
            .from_cacheable(&["12".to_string(), "twelve".to_string()])
            .unwrap_err();
        assert_eq!(err, CacheDecodeError("twelve".to_string()));
    }

    proptest! {
        /// parse(key(type, id, chain)) reproduces (type, id, chain) exactly;
        /// `None` and `Some([])` both serialize to the chainless key.
        #[test]
        fn key_round_trips(
            vertex_type in prop_oneof![Just(VertexType::User), Just(VertexType::AppUser)],
            principal in "[A-Za-z0-9_.@-]{1,24}",
            chain in prop::option::of(prop::collection::vec("[A-Za-z0-9_-]{1,12}", 1..4)),
        ) {
            let original = query(vertex_type, &principal, chain.clone());
            let mut parsed = query(VertexType::User, "placeholder", None);
            parsed.update_from_key(&original.key()).unwrap();

            prop_assert_eq!(parsed.vertex_type(), vertex_type);
            prop_assert_eq!(parsed.principal(), principal.as_str());
            prop_assert_eq!(parsed.chain(), chain.as_deref());
        }

        /// from_cacheable(to_cacheable(S)) == S for any finite set.
        #[test]
        fn cacheable_round_trips(values in prop::collection::btree_set(any::<u64>(), 0..64)) {
            let q = query(VertexType::User, "jared", None);
            let encoded = q.to_cacheable(&values);
            prop_assert_eq!(q.from_cacheable(&encoded).unwrap(), values);
        }
    }
}
