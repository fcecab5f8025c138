// Copyright 2026 Masq Developers
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod channel;
pub mod disguise;
pub mod reexec;
