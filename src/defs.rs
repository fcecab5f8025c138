// Masq constants

use std::os::fd::RawFd;

// Descriptor index the re-exec child inherits the side channel on.
// Shared convention between parent and child; never negotiated at runtime.
pub const SIDE_CHANNEL_FD: RawFd = 3;

// Default location of the operator config
pub const CONFIG_FILE_DEFAULT: &str = "/etc/masq/config.toml";

// Command lines of long-running services common enough to be ignored.
// Used whenever the live process table gives us nothing to borrow.
pub const STATIC_CATALOG: &[&[&str]] = &[
    &["/lib/systemd/systemd-journald"],
    &["/lib/systemd/systemd-localed"],
    &["/lib/systemd/systemd-networkd"],
    &["/lib/systemd/systemd-resolved"],
    &["ssh-agent"],
    &[
        "/usr/bin/dbus-daemon",
        "--system",
        "--address=systemd:",
        "--nofork",
        "--nopidfile",
        "--systemd-activation",
        "--syslog-only",
    ],
    &["/usr/sbin/nsd", "-d"],
    &["/usr/sbin/cron", "-f"],
    &["/usr/sbin/ModemManager", "--filter-policy=strict"],
    &["/usr/lib/policykit-1/polkitd", "--no-debug"],
    &["/usr/sbin/sshd", "-D"],
    &["/sbin/dhclient"],
    &["/usr/sbin/NetworkManager", "--no-daemon"],
    &["/usr/sbin/rsyslogd", "-n"],
    &[
        "/sbin/agetty", "-o", "-p", "--", "\\u", "--noclear", "tty1", "linux",
    ],
    &["/sbin/rpcbind", "-w"],
];

// A first argv token containing any of these substrings marks the process
// as boring. Plain containment, case-sensitive; false positives accepted.
pub const BORING_FRAGMENTS: &[&str] = &[
    "httpd",
    "apache",
    "nginx",
    "dhcpcd",
    "/lib/systemd/systemd-",
    "cron",
    "dbus-daemon",
    "getty",
    "rsyslogd",
    "ntp",
    "wpa_supplicant",
    "NetworkManager",
    "docker",
    "vnc",
    "php-fpm",
    "redis-server",
    "postgres",
    "mysql",
    "mariadb",
    "php",
    "fcgi",
    "proftpd",
    "dhclient",
    "mongod",
    "dovecot",
];
