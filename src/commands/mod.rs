// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod ask;
pub mod explain;
pub mod fx;
pub mod exporter;
pub mod doctor;
