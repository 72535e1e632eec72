//! Built-in artifact templates
//!
//! Registered into Tera under fixed names; a templates directory holding
//! files with the same names overrides them. Templates substitute and
//! iterate only; every decision (priority, election state, backend list,
//! join target) is computed in [`crate::render`] and passed resolved.

pub const HAPROXY_NAME: &str = "haproxy.cfg.tera";
pub const KEEPALIVED_NAME: &str = "keepalived.conf.tera";
pub const RKE2_CONFIG_NAME: &str = "rke2-config.yaml.tera";

/// (template name, built-in content) pairs
pub const BUILTINS: [(&str, &str); 3] = [
    (HAPROXY_NAME, HAPROXY),
    (KEEPALIVED_NAME, KEEPALIVED),
    (RKE2_CONFIG_NAME, RKE2_CONFIG),
];

/// HAProxy config fronting the kube-apiserver and RKE2 supervisor ports
pub const HAPROXY: &str = r#"global
    log /dev/log local0
    maxconn 4096
    daemon

defaults
    log global
    mode tcp
    option tcplog
    timeout connect 10s
    timeout client 1m
    timeout server 1m

frontend kube_apiserver
    bind *:6443
    default_backend kube_apiserver_backend

backend kube_apiserver_backend
    balance roundrobin
    option tcp-check
{% for server in api_servers %}    server {{ server.name }} {{ server.ip_addr }}:6443 check
{% endfor %}
frontend rke2_supervisor
    bind *:9345
    default_backend rke2_supervisor_backend

backend rke2_supervisor_backend
    balance roundrobin
{% for server in api_servers %}    server {{ server.name }} {{ server.ip_addr }}:9345 check
{% endfor %}"#;

/// keepalived VRRP instance for one load-balancer node
pub const KEEPALIVED: &str = r#"vrrp_script chk_haproxy {
    script "killall -0 haproxy"
    interval 2
    weight 2
}

# {{ current_host }}
vrrp_instance VI_1 {
    interface {{ nic }}
    state {% if is_master %}MASTER{% else %}BACKUP{% endif %}
    virtual_router_id 51
    priority {{ priority }}
    advert_int 1

    unicast_src_ip {{ current_ip }}
    unicast_peer {
{% for peer in peer_ips %}        {{ peer }}
{% endfor %}    }

    authentication {
        auth_type PASS
        auth_pass {{ password }}
    }

    virtual_ipaddress {
        {{ virtual_ip }}
    }

    track_script {
        chk_haproxy
    }
}
"#;

/// RKE2 bootstrap config fragment, shared by every role
pub const RKE2_CONFIG: &str = r#"{% if server %}server: {{ server }}
{% endif %}token: {{ token }}
{% if tls_san %}tls-san:
{% for addr in tls_san %}  - {{ addr }}
{% endfor %}{% endif %}{% if node_label %}node-label:
  - {{ node_label }}
{% endif %}"#;
