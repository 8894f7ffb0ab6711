//! Command builders for the external tools the harness drives.
//!
//! Every function here only describes a command; nothing is executed.

use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use super::command::CommandSpec;
use crate::topology::InterfaceAddress;

/// Line tcpdump prints on stderr once the capture is open
pub const TCPDUMP_READY_MARKER: &str = "listening on";

/// Line iperf3 prints once the server accepts connections
pub const IPERF_READY_MARKER: &str = "Server listening";

/// `ping -c {count} {target}`
pub fn ping(target: Ipv4Addr, count: u32) -> CommandSpec {
    CommandSpec::new("ping")
        .arg("-c")
        .arg(count.to_string())
        .arg(target.to_string())
}

/// Detached `tcpdump` writing every packet except `filter`-excluded ones to `file`
pub fn tcpdump(interface: &str, file: &Path, filter: &str) -> CommandSpec {
    CommandSpec::new("tcpdump")
        .arg("-i")
        .arg(interface)
        .arg("-U")
        .arg("-w")
        .arg(file.to_string_lossy())
        .arg(filter)
        .detached()
}

/// Detached foreground `iperf3 -s`; stopped by handle rather than daemonized
pub fn iperf3_server() -> CommandSpec {
    CommandSpec::new("iperf3").arg("-s").detached()
}

/// `iperf3 -c {server} -t {secs}`
pub fn iperf3_client(server: Ipv4Addr, duration: Duration) -> CommandSpec {
    CommandSpec::new("iperf3")
        .arg("-c")
        .arg(server.to_string())
        .arg("-t")
        .arg(duration.as_secs().max(1).to_string())
}

/// Enable spanning tree on an Open vSwitch bridge
pub fn ovs_enable_stp(bridge: &str) -> CommandSpec {
    CommandSpec::new("ovs-vsctl").args(["set", "bridge", bridge, "stp_enable=true"])
}

/// Port and feature dump of a bridge
pub fn ovs_show(bridge: &str) -> CommandSpec {
    CommandSpec::new("ovs-ofctl").args(["show", bridge])
}

/// Per-port STP state of a bridge
pub fn ovs_stp_show(bridge: &str) -> CommandSpec {
    CommandSpec::new("ovs-appctl").args(["stp/show", bridge])
}

pub fn ovs_add_bridge(bridge: &str) -> CommandSpec {
    CommandSpec::new("ovs-vsctl").args(["--may-exist", "add-br", bridge])
}

pub fn ovs_del_bridge(bridge: &str) -> CommandSpec {
    CommandSpec::new("ovs-vsctl").args(["--if-exists", "del-br", bridge])
}

pub fn ovs_add_port(bridge: &str, port: &str) -> CommandSpec {
    CommandSpec::new("ovs-vsctl").args(["--may-exist", "add-port", bridge, port])
}

/// `standalone` makes the bridge a plain learning switch; `secure` defers to the controller
pub fn ovs_fail_mode(bridge: &str, mode: &str) -> CommandSpec {
    CommandSpec::new("ovs-vsctl").args(["set-fail-mode", bridge, mode])
}

pub fn ovs_set_controller(bridge: &str, ip: Ipv4Addr, port: u16) -> CommandSpec {
    CommandSpec::new("ovs-vsctl")
        .args(["set-controller", bridge])
        .arg(format!("tcp:{}:{}", ip, port))
}

pub fn netns_add(name: &str) -> CommandSpec {
    CommandSpec::new("ip").args(["netns", "add", name])
}

pub fn netns_del(name: &str) -> CommandSpec {
    CommandSpec::new("ip").args(["netns", "del", name])
}

/// Deleting either end of a veth pair removes both
pub fn link_del(interface: &str) -> CommandSpec {
    CommandSpec::new("ip").args(["link", "del", interface])
}

pub fn veth_pair(a: &str, b: &str) -> CommandSpec {
    CommandSpec::new("ip").args(["link", "add", a, "type", "veth", "peer", "name", b])
}

pub fn link_to_netns(interface: &str, namespace: &str) -> CommandSpec {
    CommandSpec::new("ip").args(["link", "set", interface, "netns", namespace])
}

pub fn link_up(interface: &str) -> CommandSpec {
    CommandSpec::new("ip").args(["link", "set", interface, "up"])
}

/// Remove every address from `interface`
pub fn addr_flush(interface: &str) -> CommandSpec {
    CommandSpec::new("ip").args(["addr", "flush", "dev", interface])
}

pub fn addr_add(interface: &str, address: &InterfaceAddress) -> CommandSpec {
    CommandSpec::new("ip")
        .args(["addr", "add"])
        .arg(address.to_string())
        .args(["dev", interface])
}

pub fn default_route(via: Ipv4Addr) -> CommandSpec {
    CommandSpec::new("ip")
        .args(["route", "add", "default", "via"])
        .arg(via.to_string())
}

/// Fixed propagation delay on an interface
pub fn netem_delay(interface: &str, delay: Duration) -> CommandSpec {
    CommandSpec::new("tc")
        .args(["qdisc", "add", "dev", interface, "root", "netem", "delay"])
        .arg(format!("{}ms", delay.as_millis()))
}

pub fn enable_ip_forwarding() -> CommandSpec {
    CommandSpec::new("sysctl").args(["-w", "net.ipv4.ip_forward=1"])
}

/// `iptables` with the given argument list
pub fn iptables<I, S>(args: I) -> CommandSpec
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    CommandSpec::new("iptables").args(args)
}
