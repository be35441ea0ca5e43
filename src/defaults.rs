//! Compiled-in defaults and the module catalog.
//!
//! Both tables are immutable and materialized once per process.

use std::sync::LazyLock;

use serde::Serialize;
use serde_yaml::Value;

use crate::types::{Document, Domain};

const BUILTIN_YAML: &str = r#"
network:
  interfaces:
    eth0:
      type: ethernet
      enabled: true
      ipv4:
        method: dhcp
        address: ""
        netmask: ""
        gateway: ""
      ipv6:
        enabled: false
        method: auto
        address: ""
        prefix_length: 64
        gateway: ""
    eth1:
      type: ethernet
      enabled: true
      ipv4:
        method: static
        address: 192.168.1.1
        netmask: 255.255.255.0
        gateway: ""
      ipv6:
        enabled: false
        method: auto
        address: ""
        prefix_length: 64
        gateway: ""
  wan_interface: eth0
  lan_interface: eth1
  dhcp_server:
    enabled: true
    range_start: 192.168.1.100
    range_end: 192.168.1.200
    lease_time: 86400
  hostname: ArmRouter
  dns_servers:
    - 1.1.1.1
    - 8.8.8.8
wifi:
  client:
    network_scan_interval: 30
    auto_reconnect: true
  access_point:
    ssid: ArmRouter-AP
    password: password123
    encryption: WPA2
    channel: 6
    hide_ssid: false
    max_clients: 10
firewall:
  enabled: true
  allow_ping: true
  allow_established: true
  allow_related: true
  default_policy:
    input: DROP
    forward: DROP
    output: ACCEPT
  open_ports:
    - {port: 22, protocol: tcp, description: Allow SSH}
    - {port: 80, protocol: tcp, description: Allow HTTP}
    - {port: 443, protocol: tcp, description: Allow HTTPS}
  rules:
    - {name: Allow SSH, chain: INPUT, protocol: tcp, destination_port: "22", action: ACCEPT, priority: 100, enabled: true}
    - {name: Allow HTTP, chain: INPUT, protocol: tcp, destination_port: "80", action: ACCEPT, priority: 100, enabled: true}
    - {name: Allow HTTPS, chain: INPUT, protocol: tcp, destination_port: "443", action: ACCEPT, priority: 100, enabled: true}
tunnel:
  enabled: false
  traffic_routing:
    mode: all
    tunnel_selection: first_available
    geo_countries: [US, GB, DE]
    ip_addresses: [8.8.8.8/32, 1.1.1.1/32]
    domains: [example.com, example.org]
    load_balance_algorithm: round_robin
  tunnels:
    - name: OpenVPN US
      type: openvpn
      enabled: false
      priority: 10
      default: true
      config:
        config_file: /etc/openvpn/us-server.conf
        advanced: {mtu: 1500, cipher: AES-256-GCM}
    - name: WireGuard DE
      type: wireguard
      enabled: false
      priority: 20
      default: false
      config:
        interface: wg0
        address: 10.10.10.2/24
        dns: [8.8.8.8, 1.1.1.1]
        peers:
          - endpoint: de-server.example.com:51820
            allowed_ips: [0.0.0.0/0]
            keep_alive: 25
  tor:
    enabled: false
    use_bridges: false
    use_redsocks: true
    use_socks2tun: false
    exit_country: us
    bridges: []
    tunnel_proxy: {enabled: false, tunnel_name: OpenVPN US}
routing:
  static_routes:
    - destination: 192.168.100.0/24
      gateway: 192.168.1.254
      interface: eth1
      metric: 100
      enabled: true
  advanced:
    ip_forward: true
    use_custom_rules: false
    custom_rules_file: /etc/network/custom-routing.sh
system:
  hostname: ArmRouter
  timezone: UTC
  ntp:
    enabled: true
    servers: [0.pool.ntp.org, 1.pool.ntp.org]
  logging:
    level: info
    remote_syslog: {enabled: false, server: "", port: 514}
  power:
    cpu_governor: ondemand
    usb_power_save: false
    scheduled_reboot: {enabled: false, time: "03:00", days: [sun]}
access:
  ssh:
    enabled: true
    port: 22
    allow_root: false
    password_auth: true
    key_auth: true
  web_ui:
    port: 80
    https: {enabled: false, port: 443, certificate: self-signed}
    session_timeout: 30
  ip_restrictions:
    enabled: false
    allowed_ips: []
modules:
  installed:
    - {id: dashboard, name: Dashboard, version: 1.0.0, enabled: true, autostart: true, core: true}
    - {id: network, name: Network Settings, version: 1.0.0, enabled: true, autostart: true, core: true}
    - {id: settings, name: General Settings, version: 1.0.0, enabled: true, autostart: true, core: true}
    - {id: openvpn, name: OpenVPN, version: 1.0.0, enabled: true, autostart: true}
    - {id: wireguard, name: WireGuard, version: 1.0.0, enabled: true, autostart: true}
    - {id: tor, name: Tor, version: 1.0.0, enabled: false, autostart: false}
"#;

static BUILTIN: LazyLock<Document> = LazyLock::new(|| {
    serde_yaml::from_str(BUILTIN_YAML).expect("gatecfg: embedded default document is valid YAML")
});

/// The compiled-in default for one domain (empty if it has none).
pub fn builtin_domain(domain: Domain) -> Document {
    match BUILTIN.get(domain.key()) {
        Some(Value::Mapping(map)) => map.clone(),
        _ => Document::new(),
    }
}

/// A module the appliance knows how to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    pub core: bool,
}

const fn descriptor(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    core: bool,
) -> ModuleDescriptor {
    ModuleDescriptor {
        id,
        name,
        description,
        version: "1.0.0",
        core,
    }
}

pub const CATALOG: &[ModuleDescriptor] = &[
    descriptor("dashboard", "Dashboard", "System overview and status", true),
    descriptor("network", "Network Settings", "WAN and LAN configuration", true),
    descriptor("settings", "General Settings", "System-wide settings", true),
    descriptor("wifi", "WiFi Configuration", "WiFi network setup", false),
    descriptor("firewall", "Firewall", "Network security rules", false),
    descriptor("tunnel", "Tunnel Manager", "VPN, Tor and other tunneling options", false),
    descriptor("routing", "Routing", "Network routing configuration", false),
    descriptor("openvpn", "OpenVPN", "OpenVPN client tunnels", false),
    descriptor("wireguard", "WireGuard", "WireGuard peer tunnels", false),
    descriptor("tor", "Tor", "Tor transparent proxy", false),
    descriptor("zerotier", "ZeroTier One", "Secure mesh network virtualization", false),
    descriptor("sstp", "SSTP VPN", "Secure Socket Tunneling Protocol for VPN", false),
    descriptor("ikev2", "IKEv2/IPsec", "Internet Key Exchange version 2 with IPsec", false),
    descriptor("pptp", "PPTP VPN", "Point-to-Point Tunneling Protocol", false),
];

pub fn catalog_entry(id: &str) -> Option<&'static ModuleDescriptor> {
    CATALOG.iter().find(|m| m.id == id)
}
