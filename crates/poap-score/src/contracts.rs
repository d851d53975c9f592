// Copyright 2026 PoapScore Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Minimal on-chain interface of the POAP token contract.

alloy::sol! {
    /// The POAP contract is an ERC-721 whose deployments do not all support
    /// the enumerable extension; `tokenEvent` maps a minted token to the
    /// real-world event it attests. The `Transfer` event signature drives
    /// the log-scan fallback when enumeration is unavailable.
    #[sol(rpc)]
    interface IPoapToken {
        function balanceOf(address owner) external view returns (uint256);
        function tokenOfOwnerByIndex(address owner, uint256 index) external view returns (uint256);
        function tokenEvent(uint256 tokenId) external view returns (uint256);

        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
    }
}
