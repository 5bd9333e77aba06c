//! Solidity ABI bindings for the read-only calls the oracle client issues.

use alloy_sol_types::sol;

sol! {
    /// Pool factory; `getPair` returns the zero address when no pool exists.
    interface IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }

    interface IUniswapV2Pair {
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
        function token0() external view returns (address);
        function token1() external view returns (address);
    }

    /// `decimals()` is declared as uint256 so out-of-range values reach
    /// validation instead of failing to decode.
    interface IERC20 {
        function decimals() external view returns (uint256);
    }

    /// Router pricing simulation used as the search oracle.
    interface IUniswapV2Router02 {
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
    }
}
