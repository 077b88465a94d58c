//! Ordered label synthesis for reverse-proxy routing.
//!
//! Router and load-balancer labels are recorded through explicit
//! methods on [`RouterLabels`] and flattened once at the end, instead
//! of merging scattered map literals. `set` replaces an existing key,
//! so later decisions (like free-form overrides) win without
//! duplicate emission.

use indexmap::IndexMap;

use crate::stack::BasicAuth;

/// An insertion-ordered set of `(key, value)` label pairs.
#[derive(Debug, Clone, Default)]
pub struct LabelSet {
    entries: Vec<(String, String)>,
}

impl LabelSet {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Set a label, replacing any previous value for the same key
    /// while keeping its original position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    #[must_use]
    pub fn into_map(self) -> IndexMap<String, String> {
        self.entries.into_iter().collect()
    }
}

/// Typed recorder for one router/service label pair set.
#[derive(Debug, Clone)]
pub struct RouterLabels {
    name: String,
    labels: LabelSet,
}

impl RouterLabels {
    /// Start a label set for the named router, attached to the given
    /// proxy network.
    #[must_use]
    pub fn new(name: &str, proxy_network: &str) -> Self {
        let mut labels = LabelSet::new();
        labels.set("traefik.enable", "true");
        labels.set("traefik.docker.network", proxy_network);
        Self {
            name: name.to_string(),
            labels,
        }
    }

    pub fn server_port(&mut self, port: u16) {
        self.labels.set(
            format!(
                "traefik.http.services.{}.loadbalancer.server.port",
                self.name
            ),
            port.to_string(),
        );
    }

    pub fn rule(&mut self, rule: &str) {
        self.labels.set(
            format!("traefik.http.routers.{}.rule", self.name),
            rule,
        );
    }

    pub fn entry_points(&mut self, entry_points: &[String]) {
        self.labels.set(
            format!("traefik.http.routers.{}.entrypoints", self.name),
            entry_points.join(","),
        );
    }

    pub fn tls(&mut self) {
        self.labels
            .set(format!("traefik.http.routers.{}.tls", self.name), "true");
    }

    pub fn cert_resolver(&mut self, resolver: &str) {
        self.labels.set(
            format!("traefik.http.routers.{}.tls.certresolver", self.name),
            resolver,
        );
    }

    pub fn tls_options(&mut self, options: &str) {
        self.labels.set(
            format!("traefik.http.routers.{}.tls.options", self.name),
            options,
        );
    }

    /// Explicit TLS domain, for routers serving both plain and TLS
    /// entry points.
    pub fn tls_domain(&mut self, main: &str) {
        self.labels.set(
            format!("traefik.http.routers.{}.tls.domains[0].main", self.name),
            main,
        );
    }

    pub fn priority(&mut self, priority: i64) {
        self.labels.set(
            format!("traefik.http.routers.{}.priority", self.name),
            priority.to_string(),
        );
    }

    /// Attach the middleware chain. No label is emitted for an empty
    /// chain.
    pub fn middlewares(&mut self, names: &[String]) {
        if names.is_empty() {
            return;
        }
        self.labels.set(
            format!("traefik.http.routers.{}.middlewares", self.name),
            names.join(","),
        );
    }

    /// Declare a basic-auth middleware with a pre-built users string.
    pub fn basic_auth_middleware(&mut self, middleware: &str, users: &str) {
        self.labels.set(
            format!("traefik.http.middlewares.{middleware}.basicauth.users"),
            users,
        );
    }

    /// Declare a basic-auth middleware backed by an htpasswd file.
    pub fn basic_auth_users_file(&mut self, middleware: &str, path: &str) {
        self.labels.set(
            format!("traefik.http.middlewares.{middleware}.basicauth.usersfile"),
            path,
        );
    }

    /// Declare a circuit-breaker middleware.
    pub fn circuit_breaker(&mut self, middleware: &str, expression: &str) {
        self.labels.set(
            format!("traefik.http.middlewares.{middleware}.circuitbreaker.expression"),
            expression,
        );
    }

    pub fn lb_health_check(&mut self, path: &str, interval: &str, timeout: &str) {
        if !path.is_empty() {
            self.labels.set(
                format!(
                    "traefik.http.services.{}.loadbalancer.healthcheck.path",
                    self.name
                ),
                path,
            );
        }
        self.labels.set(
            format!(
                "traefik.http.services.{}.loadbalancer.healthcheck.interval",
                self.name
            ),
            interval,
        );
        self.labels.set(
            format!(
                "traefik.http.services.{}.loadbalancer.healthcheck.timeout",
                self.name
            ),
            timeout,
        );
    }

    pub fn flush_interval(&mut self, interval: &str) {
        self.labels.set(
            format!(
                "traefik.http.services.{}.loadbalancer.responseforwarding.flushinterval",
                self.name
            ),
            interval,
        );
    }

    /// Secure, http-only, same-site-strict sticky cookie.
    pub fn sticky_cookie(&mut self, cookie_name: &str) {
        let base = format!("traefik.http.services.{}.loadbalancer.sticky.cookie", self.name);
        self.labels.set(base.clone(), "true");
        self.labels.set(format!("{base}.name"), cookie_name);
        self.labels.set(format!("{base}.secure"), "true");
        self.labels.set(format!("{base}.httponly"), "true");
        self.labels.set(format!("{base}.samesite"), "strict");
    }

    /// Free-form override, applied verbatim.
    pub fn set_raw(&mut self, key: &str, value: &str) {
        self.labels.set(key, value);
    }

    #[must_use]
    pub fn finish(self) -> IndexMap<String, String> {
        self.labels.into_map()
    }
}

/// Escape `$` by doubling it: the manifest format treats `$` as a
/// variable-interpolation marker, and password hashes are full of
/// them.
#[must_use]
pub fn escape_dollars(value: &str) -> String {
    value.replace('$', "$$")
}

/// Build the `user:hash` list for a basic-auth middleware from either
/// the legacy single-user form or the multi-user map.
#[must_use]
pub fn basic_auth_users(auth: &BasicAuth) -> String {
    let mut users = Vec::new();

    if !auth.username.is_empty() && !auth.password.is_empty() {
        users.push(format!("{}:{}", auth.username, escape_dollars(&auth.password)));
    }

    for (username, password) in &auth.users {
        users.push(format!("{username}:{}", escape_dollars(password)));
    }

    users.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn set_replaces_in_place() {
        let mut set = LabelSet::new();
        set.set("a", "1");
        set.set("b", "2");
        set.set("a", "3");

        let map = set.into_map();
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(map["a"], "3");
    }

    #[test]
    fn router_labels_basic_shape() {
        let mut router = RouterLabels::new("web", "demo_traefik");
        router.server_port(80);
        router.rule("Host(`app.localhost`)");
        router.entry_points(&["web".to_string()]);

        let map = router.finish();
        assert_eq!(map["traefik.enable"], "true");
        assert_eq!(map["traefik.docker.network"], "demo_traefik");
        assert_eq!(
            map["traefik.http.services.web.loadbalancer.server.port"],
            "80"
        );
        assert_eq!(
            map["traefik.http.routers.web.rule"],
            "Host(`app.localhost`)"
        );
        assert_eq!(map["traefik.http.routers.web.entrypoints"], "web");
    }

    #[test]
    fn empty_middleware_chain_emits_nothing() {
        let mut router = RouterLabels::new("web", "demo_traefik");
        router.middlewares(&[]);

        let map = router.finish();
        assert!(!map.contains_key("traefik.http.routers.web.middlewares"));
    }

    #[test]
    fn sticky_cookie_labels() {
        let mut router = RouterLabels::new("api", "p_traefik");
        router.sticky_cookie("_api_server");

        let map = router.finish();
        let base = "traefik.http.services.api.loadbalancer.sticky.cookie";
        assert_eq!(map[base], "true");
        assert_eq!(map[&format!("{base}.name")], "_api_server");
        assert_eq!(map[&format!("{base}.secure")], "true");
        assert_eq!(map[&format!("{base}.httponly")], "true");
        assert_eq!(map[&format!("{base}.samesite")], "strict");
    }

    #[test]
    fn dollars_doubled_in_hashes() {
        assert_eq!(
            escape_dollars("$2a$14$abcdef"),
            "$$2a$$14$$abcdef"
        );
    }

    #[test]
    fn users_from_both_forms() {
        let mut users = IndexMap::new();
        users.insert("alice".to_string(), "$2y$x".to_string());

        let auth = crate::stack::BasicAuth {
            enabled: true,
            username: "admin".to_string(),
            password: "$2a$hash".to_string(),
            users,
            users_file: String::new(),
        };

        assert_eq!(
            basic_auth_users(&auth),
            "admin:$$2a$$hash,alice:$$2y$$x"
        );
    }
}
